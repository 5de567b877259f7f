use ratatui::prelude::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
  #[default]
  Dark,
  Light,
}

/// Colors every view draws with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
  pub bg: Color,
  pub fg: Color,
  pub dim: Color,
  pub accent: Color,
  pub border: Color,
  pub overlay: Color,
  pub highlight_bg: Color,
  pub success: Color,
  pub error: Color,
}

const DARK: Palette = Palette {
  bg: Color::Black,
  fg: Color::White,
  dim: Color::DarkGray,
  accent: Color::Cyan,
  border: Color::Blue,
  overlay: Color::Yellow,
  highlight_bg: Color::DarkGray,
  success: Color::Green,
  error: Color::Red,
};

const LIGHT: Palette = Palette {
  bg: Color::White,
  fg: Color::Black,
  dim: Color::Gray,
  accent: Color::Blue,
  border: Color::DarkGray,
  overlay: Color::Magenta,
  highlight_bg: Color::LightBlue,
  success: Color::Green,
  error: Color::Red,
};

impl Theme {
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "dark" => Some(Theme::Dark),
      "light" => Some(Theme::Light),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Theme::Dark => "dark",
      Theme::Light => "light",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Theme::Dark => Theme::Light,
      Theme::Light => Theme::Dark,
    }
  }

  pub fn palette(&self) -> Palette {
    match self {
      Theme::Dark => DARK,
      Theme::Light => LIGHT,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_round_trip() {
    for theme in [Theme::Dark, Theme::Light] {
      assert_eq!(Theme::parse(theme.as_str()), Some(theme));
    }
    assert_eq!(Theme::parse("solarized"), None);
  }

  #[test]
  fn test_toggle() {
    assert_eq!(Theme::Dark.toggled(), Theme::Light);
    assert_ne!(Theme::Dark.palette(), Theme::Light.palette());
  }
}
