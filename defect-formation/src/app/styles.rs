use owo_colors::Style;

// Stylesheet used to colorize prints.
#[derive(Debug, Default)]
pub(crate) struct Styles {
    pub heading_style: Style,
    pub label_style: Style,
    pub value_style: Style,
    pub level_style: Style,
}

impl Styles {
    /// Colour styles when stdout supports them, plain text otherwise
    pub(crate) fn for_stdout() -> Self {
        let mut styles = Self::default();
        if supports_color::on(supports_color::Stream::Stdout).is_some() {
            styles.colorize();
        }
        styles
    }

    pub(crate) fn colorize(&mut self) {
        self.heading_style = Style::new().bright_blue().bold();
        self.label_style = Style::new().bright_green();
        self.value_style = Style::new().bright_white();
        self.level_style = Style::new().bright_yellow();
    }
}
