use super::LayoutError;

/// Vertical page geometry in layout units, measured top-down from the page edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    page_height: f32,
    margin_top: f32,
    margin_bottom: f32,
    line_height: f32,
}

impl PageGeometry {
    /// US Letter (792pt tall) with one-inch margins and a 14pt line step.
    pub const LETTER: Self = Self {
        page_height: 792.0,
        margin_top: 72.0,
        margin_bottom: 72.0,
        line_height: 14.0,
    };

    /// Build a geometry, rejecting combinations that cannot hold a single line.
    pub fn new(
        page_height: f32,
        margin_top: f32,
        margin_bottom: f32,
        line_height: f32,
    ) -> Result<Self, LayoutError> {
        if line_height.is_nan() || line_height <= 0.0 {
            return Err(LayoutError::InvalidGeometry(format!(
                "line height must be positive, got {line_height}"
            )));
        }
        let margins_valid = margin_top >= 0.0 && margin_bottom >= 0.0;
        if !margins_valid {
            return Err(LayoutError::InvalidGeometry(
                "margins must be non-negative".to_string(),
            ));
        }
        if margin_top > page_height - margin_bottom {
            return Err(LayoutError::InvalidGeometry(format!(
                "top margin {margin_top} leaves no room above bottom margin {margin_bottom} on a {page_height} page"
            )));
        }
        Ok(Self {
            page_height,
            margin_top,
            margin_bottom,
            line_height,
        })
    }

    /// Total page height.
    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    /// Offset of the first line on every page.
    pub fn margin_top(&self) -> f32 {
        self.margin_top
    }

    /// Distance between consecutive lines.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Lowest offset at which a line may still be placed.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margin_bottom
    }
}

/// A line of text placed at a vertical offset on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    /// Text content of the line.
    pub text: String,
    /// Offset from the top edge of the page.
    pub offset: f32,
}

/// One page worth of placed lines, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Lines placed on this page.
    pub lines: Vec<PlacedLine>,
}

/// Running layout cursor shared by every paragraph of a document.
#[derive(Debug)]
pub struct Paginator {
    geometry: PageGeometry,
    pages: Vec<Page>,
    current: Option<Page>,
    cursor: f32,
}

impl Paginator {
    /// Start an empty layout with the given geometry.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: None,
            cursor: geometry.margin_top,
        }
    }

    /// Emit a line at the cursor and advance, breaking the page once the bottom margin is crossed.
    pub fn push_line(&mut self, text: impl Into<String>) {
        let page = self.current.get_or_insert_with(Page::default);
        page.lines.push(PlacedLine {
            text: text.into(),
            offset: self.cursor,
        });
        self.cursor += self.geometry.line_height;

        if self.cursor > self.geometry.bottom_limit() {
            if let Some(full) = self.current.take() {
                self.pages.push(full);
            }
            self.cursor = self.geometry.margin_top;
        }
    }

    /// Emit every line of a paragraph in order.
    pub fn push_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.push_line(line);
        }
    }

    /// Close the layout and return its pages. Never ends with an empty page.
    pub fn finish(mut self) -> Vec<Page> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.pages
    }
}

/// Lay out `lines` onto pages of the given geometry.
pub fn paginate<I, S>(lines: I, geometry: PageGeometry) -> Vec<Page>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut paginator = Paginator::new(geometry);
    paginator.push_lines(lines);
    paginator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|index| format!("line {index}")).collect()
    }

    #[test]
    fn letter_page_holds_forty_seven_lines() {
        let pages = paginate(numbered(48), PageGeometry::LETTER);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 47);
        assert_eq!(pages[1].lines.len(), 1);
        assert_eq!(pages[0].lines[0].offset, 72.0);
        assert_eq!(pages[0].lines[46].offset, 72.0 + 46.0 * 14.0);
        assert_eq!(pages[1].lines[0].offset, 72.0);
        assert_eq!(pages[1].lines[0].text, "line 47");
    }

    #[test]
    fn exactly_full_page_has_no_trailing_empty_page() {
        let pages = paginate(numbered(47), PageGeometry::LETTER);
        assert_eq!(pages.len(), 1);
        assert!(paginate(Vec::<String>::new(), PageGeometry::LETTER).is_empty());
    }

    #[test]
    fn offsets_stay_within_margins() {
        let geometry = PageGeometry::new(100.0, 10.0, 15.0, 7.0).expect("geometry");
        let pages = paginate(numbered(200), geometry);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(!page.lines.is_empty());
            for line in &page.lines {
                assert!(line.offset >= geometry.margin_top());
                assert!(line.offset <= geometry.bottom_limit());
            }
        }
        let total: usize = pages.iter().map(|page| page.lines.len()).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn paragraphs_share_one_running_cursor() {
        let geometry = PageGeometry::new(50.0, 10.0, 10.0, 10.0).expect("geometry");
        let mut paginator = Paginator::new(geometry);
        paginator.push_lines(["a1", "a2", "a3"]);
        paginator.push_lines(["b1", "b2", "b3"]);
        let pages = paginator.finish();

        let texts: Vec<Vec<&str>> = pages
            .iter()
            .map(|page| page.lines.iter().map(|line| line.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec![vec!["a1", "a2", "a3", "b1"], vec!["b2", "b3"]]);
    }

    #[test]
    fn rejects_unusable_geometry() {
        assert!(PageGeometry::new(100.0, 10.0, 10.0, 0.0).is_err());
        assert!(PageGeometry::new(100.0, 60.0, 50.0, 5.0).is_err());
        assert!(PageGeometry::new(100.0, -1.0, 10.0, 5.0).is_err());
        assert!(PageGeometry::new(100.0, 50.0, 50.0, 5.0).is_ok());
    }
}
