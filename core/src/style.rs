use colored::{Color, ColoredString, Colorize};

use crate::testing::{Status, Verdict};

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Status {
    fn color(&self) -> Color {
        use Status::*;
        let truecolor = self::is_truecolor_supported();
        match self {
            Success if truecolor => Color::TrueColor { r: 30, g: 180, b: 40 },
            Success => Color::Green,
            QuasiSuccess | AllTokensSequence | AllTokensMultiset if truecolor => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            QuasiSuccess | AllTokensSequence | AllTokensMultiset => Color::Yellow,
            MissingTokens | Fail | Inconclusive => Color::Red,
            Timeout if truecolor => Color::TrueColor { r: 220, g: 42, b: 42 },
            Timeout => Color::BrightRed,
            ScriptTestError | DefaultError | RuntimeError(_) if truecolor => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            ScriptTestError | DefaultError | RuntimeError(_) => Color::Magenta,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        match self {
            Verdict::Success => Color::Green,
            Verdict::Fail => Color::BrightRed,
        }
    }
}

pub fn status_icon(status: &Status) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightWhite
    };
    format!(" {} {} ", status.code(), status)
        .on_color(status.color())
        .bold()
        .color(fg)
}

pub fn verdict_word(verdict: Verdict) -> ColoredString {
    verdict.to_string().color(verdict.color()).bold()
}

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}
