use anyhow::{Context, Result};
use chumsky::prelude::*;
use html_escape::encode_quoted_attribute;

use crate::data::Item;

use super::ParserProcedure;

pub const FEED_CLASS: &str = "updates-feed";
pub const LIST_CLASS: &str = "updates-list";

const HEADING_PREFIX: &str = "## ";
const LIST_ITEM_PREFIX: &str = "- ";

/// A single source line, classified by its prefix alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Heading(&'a str),
    ListItem(&'a str),
    Paragraph(&'a str),
}

/// Classifies one line of Farmdown without looking at its neighbours.
///
/// Trailing line terminators and surrounding whitespace are ignored. The text
/// carried by each variant has its prefix stripped and is trimmed, but is not
/// escaped yet.
pub fn classify(line: &str) -> Line<'_> {
    let content = line.trim_end_matches(['\r', '\n']).trim_start();

    line_parser()
        .parse(content)
        .into_result()
        .unwrap_or(Line::Paragraph(content.trim_end()))
}

fn line_parser<'src>() -> impl Parser<'src, &'src str, Line<'src>> {
    let rest = any().repeated().to_slice();

    choice((
        end().to(Line::Blank),
        just(HEADING_PREFIX)
            .ignore_then(rest.clone())
            .map(|s: &'src str| Line::Heading(s.trim())),
        just(LIST_ITEM_PREFIX)
            .ignore_then(rest.clone())
            .map(|s: &'src str| Line::ListItem(s.trim())),
        rest.map(|s: &'src str| Line::Paragraph(s.trim_end())),
    ))
}

/// Converts a Farmdown document into an HTML fragment.
///
/// Headings become `<h3>`, runs of list items share one `<ul>`, and anything
/// else becomes a `<p>`. The result is always wrapped in a single
/// `<div class="updates-feed">` and ends with a newline.
pub fn convert<I>(lines: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    lines
        .into_iter()
        .fold(Feed::default(), |feed, line| feed.push(classify(line.as_ref())))
        .finish()
}

/// Splits `text` into lines and converts them. `\r\n`, `\n`, a bare `\r` and
/// the other Unicode line boundaries all end a line.
pub fn convert_str(text: &str) -> String {
    let lines = lines_parser()
        .parse(text)
        .into_result()
        .unwrap_or_else(|_| vec![text]);

    convert(lines)
}

fn line_terminator<'src>() -> impl Parser<'src, &'src str, ()> + Clone {
    choice((
        just("\r\n").ignored(),
        one_of("\n\r\u{0b}\u{0c}\u{1c}\u{1d}\u{1e}\u{85}\u{2028}\u{2029}").ignored(),
    ))
}

fn lines_parser<'src>() -> impl Parser<'src, &'src str, Vec<&'src str>> {
    any()
        .and_is(line_terminator().not())
        .repeated()
        .to_slice()
        .separated_by(line_terminator())
        .allow_trailing()
        .collect::<Vec<&'src str>>()
}

fn escape(text: &str) -> std::borrow::Cow<'_, str> {
    encode_quoted_attribute(text)
}

#[derive(Debug, Default)]
struct Feed {
    blocks: Vec<String>,
    list_open: bool,
}

impl Feed {
    fn push(mut self, line: Line<'_>) -> Self {
        match line {
            Line::Blank => self.close_list(),
            Line::Heading(text) => {
                self.close_list();
                self.blocks.push(format!("<h3>{}</h3>", escape(text)));
            }
            Line::ListItem(text) => {
                self.open_list();
                self.blocks.push(format!("  <li>{}</li>", escape(text)));
            }
            Line::Paragraph(text) => {
                self.close_list();
                self.blocks.push(format!("<p>{}</p>", escape(text)));
            }
        }

        self
    }

    fn open_list(&mut self) {
        if !self.list_open {
            self.blocks.push(format!("<ul class=\"{}\">", LIST_CLASS));
            self.list_open = true;
        }
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.blocks.push(String::from("</ul>"));
            self.list_open = false;
        }
    }

    fn finish(mut self) -> String {
        self.close_list();

        debug_assert_eq!(
            self.blocks.iter().filter(|b| b.starts_with("<ul")).count(),
            self.blocks.iter().filter(|b| *b == "</ul>").count(),
            "unbalanced list containers",
        );

        if self.blocks.is_empty() {
            format!("<div class=\"{}\">\n</div>\n", FEED_CLASS)
        } else {
            format!("<div class=\"{}\">\n{}\n</div>\n", FEED_CLASS, self.blocks.join("\n"))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FarmdownParser;

impl ParserProcedure for FarmdownParser {
    fn process(&self, item: &Item) -> Result<Item> {
        let text = item
            .text()
            .with_context(|| format!("{} is not valid UTF-8", item.path.display()))?;

        Ok(Item {
            bytes: convert_str(&text).into_bytes(),
            ..item.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use html_escape::decode_html_entities;

    use crate::{data::Item, parser::ParserProcedure};

    use super::*;

    fn inner_blocks(html: &str) -> Vec<&str> {
        html.lines()
            .filter(|l| !l.starts_with("<div") && *l != "</div>")
            .collect()
    }

    #[test]
    fn classify_lines() {
        assert_eq!(Line::Blank, classify(""));
        assert_eq!(Line::Blank, classify("   \t\r\n"));
        assert_eq!(Line::Heading("Release 1.2"), classify("## Release 1.2\n"));
        assert_eq!(Line::Heading("spaced"), classify("  ##   spaced  "));
        assert_eq!(Line::ListItem("Fixed bug"), classify("- Fixed bug\r\n"));
        assert_eq!(Line::Paragraph("Plain note."), classify("  Plain note.  "));
    }

    #[test]
    fn classify_by_prefix_only() {
        assert_eq!(Line::Paragraph("see ## below"), classify("see ## below"));
        assert_eq!(Line::Paragraph("a - b"), classify("a - b"));
        assert_eq!(Line::Paragraph("###  deeper"), classify("###  deeper"));
        assert_eq!(Line::Paragraph("-dash"), classify("-dash"));
        assert_eq!(Line::Paragraph("##"), classify("##"));
    }

    #[test]
    fn bare_prefixes_are_empty_blocks() {
        assert_eq!(Line::Heading(""), classify("## "));
        assert_eq!(Line::ListItem(""), classify("- "));

        let res = convert(["## ", "- "]);
        let expected = String::from("<div class=\"updates-feed\">\n<h3></h3>\n<ul class=\"updates-list\">\n  <li></li>\n</ul>\n</div>\n");

        assert_eq!(expected, res);
    }

    #[test]
    fn release_notes() {
        let res = convert(["## Release 1.2", "- Fixed bug A", "- Fixed bug B", "", "Plain note."]);
        let expected = String::from(
            "<div class=\"updates-feed\">\n\
             <h3>Release 1.2</h3>\n\
             <ul class=\"updates-list\">\n  \
             <li>Fixed bug A</li>\n  \
             <li>Fixed bug B</li>\n\
             </ul>\n\
             <p>Plain note.</p>\n\
             </div>\n",
        );

        assert_eq!(expected, res);
    }

    #[test]
    fn empty_document() {
        let lines: [&str; 0] = [];

        assert_eq!("<div class=\"updates-feed\">\n</div>\n", convert(lines));
        assert_eq!("<div class=\"updates-feed\">\n</div>\n", convert(["", "  ", ""]));
    }

    #[test]
    fn list_closed_at_end_of_document() {
        let res = convert(["- only item"]);

        assert_eq!(
            vec!["<ul class=\"updates-list\">", "  <li>only item</li>", "</ul>"],
            inner_blocks(&res)
        );
    }

    #[test]
    fn heading_and_paragraph_close_lists() {
        let res = convert(["- a", "## Next", "- b", "after"]);

        assert_eq!(
            vec![
                "<ul class=\"updates-list\">",
                "  <li>a</li>",
                "</ul>",
                "<h3>Next</h3>",
                "<ul class=\"updates-list\">",
                "  <li>b</li>",
                "</ul>",
                "<p>after</p>",
            ],
            inner_blocks(&res)
        );
    }

    #[test]
    fn lists_are_balanced() {
        let docs: Vec<Vec<&str>> = vec![
            vec![],
            vec!["- a"],
            vec!["- a", "", "- b", "", "", "- c"],
            vec!["## h", "- a", "- b", "p", "- c"],
            vec!["", "- a", "## h", "", "- b", "- c", ""],
            vec!["p", "p", "- ", "## ", "- x"],
        ];

        for doc in docs {
            let res = convert(&doc);
            let opens = res.matches("<ul class=\"updates-list\">").count();
            let closes = res.matches("</ul>").count();

            assert_eq!(opens, closes, "unbalanced output for {:?}", doc);
            assert!(res.starts_with("<div class=\"updates-feed\">\n"));
            assert!(res.ends_with("</div>\n"));
        }
    }

    #[test]
    fn blank_runs_collapse() {
        let res = convert(["## h", "- a", "", "p"]);
        let padded = convert(["", "", "## h", "", "", "- a", "", "", "", "p", "", ""]);

        assert_eq!(res, padded);
    }

    #[test]
    fn blanks_never_regroup_text_blocks() {
        let doc = ["## h", "- a", "- b", "p", "q", "## i"];
        let with_blanks = ["## h", "", "- a", "", "- b", "", "p", "", "q", "", "## i"];
        let text_blocks = |html: &str| -> Vec<String> {
            inner_blocks(html)
                .into_iter()
                .filter(|b| !b.starts_with("<ul") && *b != "</ul>")
                .map(String::from)
                .collect()
        };

        assert_eq!(text_blocks(&convert(doc)), text_blocks(&convert(with_blanks)));
    }

    #[test]
    fn escapes_reserved_characters() {
        let source = "<script>&\"'</script>";
        let res = convert([source]);
        let blocks = inner_blocks(&res);

        assert_eq!(1, blocks.len());

        let inner = blocks[0]
            .strip_prefix("<p>")
            .and_then(|b| b.strip_suffix("</p>"))
            .unwrap();

        assert!(!inner.contains(['<', '>', '"', '\'']));
        assert_eq!(inner.matches('&').count(), inner.matches(';').count());
        assert_eq!(source, decode_html_entities(inner));
        assert!(inner.starts_with("&lt;script&gt;&amp;"));
    }

    #[test]
    fn escapes_heading_and_item_text() {
        let res = convert(["## a < b", "- x & y"]);

        assert!(res.contains("<h3>a &lt; b</h3>"));
        assert!(res.contains("  <li>x &amp; y</li>"));
    }

    #[test]
    fn blank_line_splits_lists() {
        let res = convert(["- a", "", "- b"]);

        assert_eq!(
            vec![
                "<ul class=\"updates-list\">",
                "  <li>a</li>",
                "</ul>",
                "<ul class=\"updates-list\">",
                "  <li>b</li>",
                "</ul>",
            ],
            inner_blocks(&res)
        );
    }

    #[test]
    fn whitespace_after_prefix() {
        assert_eq!(Line::Heading(""), classify("##   "));
        assert_eq!(Line::ListItem(""), classify("-   \t"));
        assert_eq!(Line::Paragraph("-"), classify("-"));
    }

    #[test]
    fn convert_str_handles_bare_cr() {
        let res = convert_str("## a\r- b\r");
        let expected = String::from("<div class=\"updates-feed\">\n<h3>a</h3>\n<ul class=\"updates-list\">\n  <li>b</li>\n</ul>\n</div>\n");

        assert_eq!(expected, res);
        assert!(!res.contains('\r'));
    }

    #[test]
    fn convert_str_handles_unicode_line_breaks() {
        let res = convert_str("## a\u{2028}- b\u{85}- c\u{0c}tail");

        assert_eq!(convert(["## a", "- b", "- c", "tail"]), res);
    }

    #[test]
    fn convert_str_handles_crlf() {
        let res = convert_str("## Title\r\n- one\r\n- two\r\n");

        assert_eq!(convert(["## Title", "- one", "- two"]), res);
    }

    #[test]
    fn converts_concurrently() {
        let handles = (0..4)
            .map(|i| std::thread::spawn(move || convert([format!("- item {}", i)])))
            .collect::<Vec<_>>();

        for (i, handle) in handles.into_iter().enumerate() {
            let res = handle.join().unwrap();

            assert!(res.contains(&format!("<li>item {}</li>", i)));
        }
    }

    #[test]
    fn parser_procedure() {
        let item = Item {
            path: PathBuf::from("Source/Updates/Updates.md"),
            bytes: b"## News\n- shipped\n".to_vec(),
        };
        let res = FarmdownParser.process(&item).unwrap();

        assert_eq!(item.path, res.path);
        assert_eq!(convert_str("## News\n- shipped\n").into_bytes(), res.bytes);
    }

    #[test]
    fn parser_procedure_rejects_invalid_utf8() {
        let item = Item {
            path: PathBuf::from("bad.md"),
            bytes: vec![0xff, 0xfe],
        };

        assert!(FarmdownParser.process(&item).is_err());
    }
}
