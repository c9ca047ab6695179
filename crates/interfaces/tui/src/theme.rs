use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub background: Color,
    pub foreground: Color,
    pub accent: Color,
    pub muted: Color,
    pub panel: Color,
    pub highlight: Color,
    pub success: Color,
    pub danger: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Dark,
    Light,
}

impl ThemeName {
    /// Parse a config string into a [`ThemeName`].  Falls back to `Dark`
    /// for unrecognised values.
    pub fn from_config(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self {
                name,
                background: Color::Rgb(17, 24, 39),
                foreground: Color::Rgb(229, 231, 235),
                accent: Color::Rgb(96, 165, 250),
                muted: Color::Rgb(107, 114, 128),
                panel: Color::Rgb(31, 41, 55),
                highlight: Color::Rgb(30, 58, 138),
                success: Color::Rgb(74, 222, 128),
                danger: Color::Rgb(248, 113, 113),
            },
            ThemeName::Light => Self {
                name,
                background: Color::Rgb(249, 250, 251),
                foreground: Color::Rgb(17, 24, 39),
                accent: Color::Rgb(37, 99, 235),
                muted: Color::Rgb(107, 114, 128),
                panel: Color::Rgb(255, 255, 255),
                highlight: Color::Rgb(219, 234, 254),
                success: Color::Rgb(22, 163, 74),
                danger: Color::Rgb(220, 38, 38),
            },
        }
    }

    /// Build a theme from a config string (e.g. `"light"`).
    pub fn from_config(s: &str) -> Self {
        Self::from_name(ThemeName::from_config(s))
    }

    pub fn toggled(&self) -> Self {
        Self::from_name(self.name.toggled())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_name(ThemeName::Dark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fall_back_to_dark() {
        assert_eq!(ThemeName::from_config("LIGHT"), ThemeName::Light);
        assert_eq!(ThemeName::from_config("solarized"), ThemeName::Dark);
    }

    #[test]
    fn toggle_flips_between_palettes() {
        let theme = Theme::default().toggled();
        assert_eq!(theme.name, ThemeName::Light);
        assert_eq!(theme.toggled().name, ThemeName::Dark);
    }
}
