//! Word → PDF page composition.
//!
//! Paragraphs are word-wrapped onto one tall virtual column as wide as an A4
//! page. The column is then cut into page-sized tiles: the document gets
//! `ceil(column_height / page_height)` pages (at least one) and page `k`
//! shows the slice starting at offset `k * page_height`.
//!
//! A line is never split across a tile boundary; one that would cross the
//! bottom margin moves to the top margin of the next tile.
//!
//! Widths use an average Helvetica advance of 0.5 em, so wrapping is
//! approximate but never overflows for Latin text.

/// A4 in PDF points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

const AVG_CHAR_EM: f32 = 0.5;

/// Page geometry and typography for the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Line advance as a multiple of the font size.
    pub line_spacing: f32,
    /// Extra space after a paragraph, in lines.
    pub paragraph_gap: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_PT,
            height: A4_HEIGHT_PT,
            margin: 56.0,
            font_size: 11.0,
            line_spacing: 1.4,
            paragraph_gap: 0.6,
        }
    }
}

impl PageGeometry {
    fn line_height(&self) -> f32 {
        self.font_size * self.line_spacing
    }

    fn max_chars(&self) -> usize {
        let usable = (self.width - 2.0 * self.margin).max(self.font_size);
        ((usable / (self.font_size * AVG_CHAR_EM)).floor() as usize).max(1)
    }
}

/// One line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    /// Baseline distance from the page bottom (PDF user space).
    pub baseline: f32,
    pub font_size: f32,
}

/// One output page.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<PlacedLine>,
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are hard-split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_chars {
            if len > 0 {
                lines.push(std::mem::take(&mut current));
                len = 0;
            }
            let rest = chars.split_off(max_chars);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
        let wlen = chars.len();
        if wlen == 0 {
            continue;
        }
        if len > 0 && len + 1 + wlen > max_chars {
            lines.push(std::mem::take(&mut current));
            len = 0;
        }
        if len > 0 {
            current.push(' ');
            len += 1;
        }
        current.extend(chars);
        len += wlen;
    }
    if len > 0 {
        lines.push(current);
    }
    lines
}

/// Lay paragraphs out on the virtual column and cut it into pages.
pub fn layout(paragraphs: &[String], geo: &PageGeometry) -> Vec<ComposedPage> {
    let line_h = geo.line_height();
    let max_chars = geo.max_chars();

    // (top offset on the column, text)
    let mut placed: Vec<(f32, String)> = Vec::new();
    let mut y = geo.margin;
    for para in paragraphs {
        let lines = wrap(para, max_chars);
        if lines.is_empty() {
            y += line_h;
            continue;
        }
        for line in lines {
            let tile = (y / geo.height).floor();
            if y - tile * geo.height < geo.margin {
                y = tile * geo.height + geo.margin;
            }
            let tile_bottom = (tile + 1.0) * geo.height - geo.margin;
            if y + line_h > tile_bottom {
                y = (tile + 1.0) * geo.height + geo.margin;
            }
            placed.push((y, line));
            y += line_h;
        }
        y += line_h * geo.paragraph_gap;
    }

    let column_height = placed
        .last()
        .map(|(top, _)| top + line_h + geo.margin)
        .unwrap_or(0.0);
    let count = tile_count(column_height, geo.height);

    let mut pages: Vec<ComposedPage> = (0..count)
        .map(|_| ComposedPage {
            width: geo.width,
            height: geo.height,
            lines: Vec::new(),
        })
        .collect();

    for (top, text) in placed {
        let k = ((top / geo.height).floor() as usize).min(count - 1);
        let offset = k as f32 * geo.height;
        let top_in_page = top - offset;
        pages[k].lines.push(PlacedLine {
            text,
            x: geo.margin,
            baseline: geo.height - top_in_page - geo.font_size,
            font_size: geo.font_size,
        });
    }
    pages
}

/// `ceil(content_height / page_height)`, at least 1.
pub fn tile_count(content_height: f32, page_height: f32) -> usize {
    if page_height <= 0.0 {
        return 1;
    }
    ((content_height / page_height).ceil() as usize).max(1)
}
