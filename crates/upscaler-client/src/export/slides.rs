//! Minimal PresentationML package: one master, one blank layout, one theme,
//! and a slide per page with the image fitted inside a 16:9 slide.

use image::ImageFormat;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::image_dimensions;
use crate::error::ExportError;
use crate::types::Page;

/// 10in x 5.625in in EMU.
const SLIDE_CX: u64 = 9_144_000;
const SLIDE_CY: u64 = 5_143_500;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_BASE: &str = "application/vnd.openxmlformats-officedocument";
const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

/// Image placed on one slide.
struct SlideImage {
    bytes: Vec<u8>,
    extension: &'static str,
    width: u32,
    height: u32,
}

impl SlideImage {
    /// Result if present, else the source page. WebP is converted to PNG.
    fn for_page(page: &Page) -> Result<Self, ExportError> {
        let (bytes, mime) = match &page.result {
            Some(result) => (&result.bytes, result.mime_type.as_str()),
            None => (&page.source.bytes, page.source.mime_type.as_str()),
        };
        let (width, height) = image_dimensions(bytes)?;
        let image = match mime {
            "image/jpeg" | "image/jpg" => Self { bytes: bytes.clone(), extension: "jpg", width, height },
            "image/png" => Self { bytes: bytes.clone(), extension: "png", width, height },
            _ => {
                let mut png = Cursor::new(Vec::new());
                image::load_from_memory(bytes)?.write_to(&mut png, ImageFormat::Png)?;
                Self { bytes: png.into_inner(), extension: "png", width, height }
            },
        };
        Ok(image)
    }

    /// Offset and extent that fit the image inside the slide, centered.
    fn placement(&self) -> (u64, u64, u64, u64) {
        let (w, h) = (u64::from(self.width.max(1)), u64::from(self.height.max(1)));
        let (cx, cy) = if w * SLIDE_CY > h * SLIDE_CX {
            (SLIDE_CX, SLIDE_CX * h / w)
        } else {
            (SLIDE_CY * w / h, SLIDE_CY)
        };
        ((SLIDE_CX - cx) / 2, (SLIDE_CY - cy) / 2, cx, cy)
    }
}

fn relationships(entries: &[(String, &str, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{target}"/>"#)
        })
        .collect();
    format!(
        r#"{XML_HEADER}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
    )
}

fn content_types(slide_count: usize) -> String {
    let slides: String = (1..=slide_count)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{CT_BASE}.presentationml.slide+xml"/>"#
            )
        })
        .collect();
    format!(
        concat!(
            "{header}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="png" ContentType="image/png"/>"#,
            r#"<Default Extension="jpg" ContentType="image/jpeg"/>"#,
            r#"<Override PartName="/ppt/presentation.xml" ContentType="{ct}.presentationml.presentation.main+xml"/>"#,
            r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{ct}.presentationml.slideMaster+xml"/>"#,
            r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{ct}.presentationml.slideLayout+xml"/>"#,
            r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="{ct}.theme+xml"/>"#,
            "{slides}</Types>"
        ),
        header = XML_HEADER,
        ct = CT_BASE,
        slides = slides
    )
}

fn presentation(slide_count: usize) -> String {
    // rId1 is the master, rId2 the theme; slides follow.
    let ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
        .collect();
    format!(
        r#"{XML_HEADER}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn slide_master() -> String {
    format!(
        r#"{XML_HEADER}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_HEADER}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let colors: String = [
        ("dk2", "44546A"),
        ("lt2", "E7E6E6"),
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ]
    .iter()
    .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
    .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let fills = fill.repeat(3);
    let lines = format!(r#"<a:ln w="6350">{fill}</a:ln>"#).repeat(3);
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);
    let font = |face: &str| format!(r#"<a:latin typeface="{face}"/><a:ea typeface=""/><a:cs typeface=""/>"#);

    format!(
        concat!(
            "{header}",
            r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>"#,
            r#"<a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>"#,
            r#"<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>{colors}</a:clrScheme>"#,
            r#"<a:fontScheme name="Office"><a:majorFont>{major}</a:majorFont><a:minorFont>{minor}</a:minorFont></a:fontScheme>"#,
            r#"<a:fmtScheme name="Office"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst>"#,
            r#"<a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme>"#,
            "</a:themeElements></a:theme>"
        ),
        header = XML_HEADER,
        colors = colors,
        major = font("Calibri Light"),
        minor = font("Calibri"),
        fills = fills,
        lines = lines,
        effects = effects
    )
}

fn slide(number: usize, image: &SlideImage) -> String {
    let (x, y, cx, cy) = image.placement();
    format!(
        concat!(
            "{header}<p:sld {ns}><p:cSld><p:spTree>{tree}",
            r#"<p:pic><p:nvPicPr><p:cNvPr id="2" name="Page {number}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            "</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        header = XML_HEADER,
        ns = NS,
        tree = EMPTY_TREE,
        number = number,
        x = x,
        y = y,
        cx = cx,
        cy = cy
    )
}

type PackageWriter = ZipWriter<Cursor<Vec<u8>>>;

fn put(
    zip: &mut PackageWriter,
    name: String,
    body: &[u8],
    options: SimpleFileOptions,
) -> Result<(), ExportError> {
    zip.start_file(name, options)?;
    zip.write_all(body)?;
    Ok(())
}

/// Presentation with one slide per page, in page order.
pub fn export_pptx(pages: &[Page]) -> Result<Vec<u8>, ExportError> {
    if pages.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);
    let images = ordered.into_iter().map(SlideImage::for_page).collect::<Result<Vec<_>, _>>()?;

    let xml = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let media = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    put(&mut zip, "[Content_Types].xml".into(), content_types(images.len()).as_bytes(), xml)?;
    put(
        &mut zip,
        "_rels/.rels".into(),
        relationships(&[("rId1".into(), "officeDocument", "ppt/presentation.xml".into())]).as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/presentation.xml".into(), presentation(images.len()).as_bytes(), xml)?;

    let mut presentation_rels = vec![
        ("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("rId2".to_string(), "theme", "theme/theme1.xml".to_string()),
    ];
    presentation_rels.extend(
        (1..=images.len()).map(|n| (format!("rId{}", n + 2), "slide", format!("slides/slide{n}.xml"))),
    );
    put(
        &mut zip,
        "ppt/_rels/presentation.xml.rels".into(),
        relationships(&presentation_rels).as_bytes(),
        xml,
    )?;

    put(&mut zip, "ppt/slideMasters/slideMaster1.xml".into(), slide_master().as_bytes(), xml)?;
    put(
        &mut zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
        relationships(&[
            ("rId1".into(), "slideLayout", "../slideLayouts/slideLayout1.xml".into()),
            ("rId2".into(), "theme", "../theme/theme1.xml".into()),
        ])
        .as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/slideLayouts/slideLayout1.xml".into(), slide_layout().as_bytes(), xml)?;
    put(
        &mut zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
        relationships(&[("rId1".into(), "slideMaster", "../slideMasters/slideMaster1.xml".into())])
            .as_bytes(),
        xml,
    )?;
    put(&mut zip, "ppt/theme/theme1.xml".into(), theme().as_bytes(), xml)?;

    for (i, image) in images.iter().enumerate() {
        let n = i + 1;
        let media_name = format!("image{n}.{}", image.extension);
        put(&mut zip, format!("ppt/slides/slide{n}.xml"), slide(n, image).as_bytes(), xml)?;
        put(
            &mut zip,
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[
                ("rId1".into(), "slideLayout", "../slideLayouts/slideLayout1.xml".into()),
                ("rId2".into(), "image", format!("../media/{media_name}")),
            ])
            .as_bytes(),
            xml,
        )?;
        put(&mut zip, format!("ppt/media/{media_name}"), &image.bytes, media)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_pages::page;
    use std::io::Read;
    use zip::ZipArchive;

    fn read(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_pptx_has_slide_per_page_with_source_fallback() {
        let pages = vec![page(1, 8, 4, None), page(0, 4, 8, Some(90))];

        let bytes = export_pptx(&pages).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let slides = archive.file_names().filter(|n| n.starts_with("ppt/slides/slide")).count();
        assert_eq!(slides, 2);
        assert_eq!(read(&mut archive, "ppt/media/image1.png"), pages[1].result.as_ref().unwrap().bytes);
        assert_eq!(read(&mut archive, "ppt/media/image2.png"), pages[0].source.bytes);

        let presentation = String::from_utf8(read(&mut archive, "ppt/presentation.xml")).unwrap();
        assert!(presentation.contains(r#"<p:sldId id="257" r:id="rId4"/>"#));
        let rels = String::from_utf8(read(&mut archive, "ppt/_rels/presentation.xml.rels")).unwrap();
        assert!(rels.contains(r#"Id="rId4""#) && rels.contains(r#"Target="slides/slide2.xml""#));
    }

    #[test]
    fn test_placement_fits_inside_slide() {
        let tall = SlideImage { bytes: vec![], extension: "png", width: 1000, height: 2000 };
        let (x, y, cx, cy) = tall.placement();
        assert_eq!((y, cy), (0, SLIDE_CY));
        assert_eq!(cx, SLIDE_CY / 2);
        assert_eq!(x, (SLIDE_CX - cx) / 2);

        let wide = SlideImage { bytes: vec![], extension: "png", width: 4000, height: 1000 };
        let (x, _, cx, cy) = wide.placement();
        assert_eq!((x, cx), (0, SLIDE_CX));
        assert_eq!(cy, SLIDE_CX / 4);
    }
}
