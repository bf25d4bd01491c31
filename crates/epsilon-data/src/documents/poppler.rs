//! Page text and rendering through the poppler command-line tools.

use super::locate::{PageText, Word};
use crate::error::{DataError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use std::process::Command;

/// Access to the pages of a report document.
pub trait PageSource {
    /// Words of every page, in page order.
    fn page_texts(&self, pdf: &Path) -> Result<Vec<PageText>>;

    /// Render the page at `page_index` (zero-based) to a PNG at `output`.
    fn render_page(&self, pdf: &Path, page_index: usize, output: &Path) -> Result<()>;
}

/// [`PageSource`] backed by `pdftotext -bbox` and `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerPageSource {
    /// Rendering resolution in DPI.
    pub resolution: u32,
}

impl Default for PopplerPageSource {
    fn default() -> Self {
        Self { resolution: 300 }
    }
}

impl PopplerPageSource {
    /// Create a source rendering at `resolution` DPI.
    pub const fn new(resolution: u32) -> Self {
        Self { resolution }
    }
}

fn run(tool: &'static str, pdf: &Path, command: &mut Command) -> Result<Vec<u8>> {
    let output = command.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DataError::PageTool {
            tool,
            path: pdf.to_path_buf(),
            reason: format!("{} {}", output.status, stderr.trim()),
        });
    }
    Ok(output.stdout)
}

impl PageSource for PopplerPageSource {
    fn page_texts(&self, pdf: &Path) -> Result<Vec<PageText>> {
        let stdout = run(
            "pdftotext",
            pdf,
            Command::new("pdftotext").arg("-bbox").arg(pdf).arg("-"),
        )?;
        parse_bbox_html(&String::from_utf8_lossy(&stdout))
    }

    fn render_page(&self, pdf: &Path, page_index: usize, output: &Path) -> Result<()> {
        // pdftoppm appends the extension itself
        let prefix = output.with_extension("");
        let page = (page_index + 1).to_string();
        run(
            "pdftoppm",
            pdf,
            Command::new("pdftoppm")
                .args(["-f", &page, "-l", &page])
                .args(["-r", &self.resolution.to_string()])
                .args(["-png", "-singlefile"])
                .arg(pdf)
                .arg(&prefix),
        )?;
        Ok(())
    }
}

fn word_top(e: &BytesStart<'_>) -> Result<f64> {
    let attr = e
        .try_get_attribute("yMin")
        .map_err(|err| DataError::XmlParse(err.to_string()))?
        .ok_or_else(|| DataError::XmlParse("word without yMin".to_string()))?;
    let value = attr
        .unescape_value()
        .map_err(|err| DataError::XmlParse(err.to_string()))?;
    value
        .trim()
        .parse()
        .map_err(|_| DataError::XmlParse(format!("invalid yMin '{}'", value)))
}

/// Parse the XHTML written by `pdftotext -bbox`.
pub fn parse_bbox_html(xml: &str) -> Result<Vec<PageText>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<PageText> = Vec::new();
    let mut word: Option<Word> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(PageText::default()),
                b"word" => word = Some(Word::new(String::new(), word_top(&e)?)),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(PageText::default());
            }
            Ok(Event::Text(t)) => {
                if let Some(w) = word.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|err| DataError::XmlParse(err.to_string()))?;
                    w.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => {
                if let (Some(w), Some(page)) = (word.take(), pages.last_mut()) {
                    page.words.push(w);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(DataError::XmlParse(format!("XML parse error: {}", e))),
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BBOX: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="Acrobat Distiller"/>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="36.0" yMin="40.5" xMax="90.0" yMax="52.0">Earnings</word>
    <word xMin="92.0" yMin="40.5" xMax="140.0" yMax="52.0">Insight</word>
  </page>
  <page width="612.000000" height="792.000000">
    <word xMin="36.0" yMin="712.25" xMax="90.0" yMax="724.0">Bottom-Up</word>
    <word xMin="92.0" yMin="712.25" xMax="120.0" yMax="724.0">EPS</word>
    <word xMin="122.0" yMin="712.25" xMax="160.0" yMax="724.0">Current</word>
    <word xMin="162.0" yMin="712.25" xMax="170.0" yMax="724.0">&amp;</word>
  </page>
  <page width="612.000000" height="792.000000">
  </page>
</doc>
</body>
</html>"#;

    #[test]
    fn test_parse_bbox_html() {
        let pages = parse_bbox_html(BBOX).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text(), "Earnings Insight");
        assert_eq!(pages[1].words.len(), 4);
        assert_eq!(pages[1].words[0].top, 712.25);
        assert_eq!(pages[1].words[3].text, "&");
        assert!(pages[2].words.is_empty());
    }

    #[test]
    fn test_word_without_position_is_rejected() {
        let xml = "<doc><page><word>EPS</word></page></doc>";
        assert!(matches!(
            parse_bbox_html(xml),
            Err(DataError::XmlParse(_))
        ));
    }
}
