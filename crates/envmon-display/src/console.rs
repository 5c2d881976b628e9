use crate::{DisplayResult, DisplaySink, PageDescriptor};
use std::io::Write;

pub const DEFAULT_WIDTH: usize = 32;
const MIN_WIDTH: usize = 12;

/// Frames pages as fixed-width text on any writer
pub struct ConsoleDisplay<W: Write + Send> {
    out: W,
    width: usize,
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(MIN_WIDTH),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&self) -> String {
        format!("+{}+", "-".repeat(self.width - 2))
    }

    fn row(&self, text: &str) -> String {
        let inner = self.width - 4;
        let clipped: String = text.chars().take(inner).collect();
        let pad = inner - clipped.chars().count();
        format!("| {}{} |", clipped, " ".repeat(pad))
    }
}

impl<W: Write + Send> DisplaySink for ConsoleDisplay<W> {
    fn render(&mut self, page: &PageDescriptor) -> DisplayResult<()> {
        let mut frame = Vec::new();
        frame.push(self.rule());
        frame.push(self.row(&page.title()));
        frame.push(self.rule());
        for line in page.lines() {
            frame.push(self.row(&line));
        }
        frame.push(self.rule());

        for line in frame {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> DisplayResult<()> {
        write!(self.out, "\x1b[2J\x1b[H")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmon_core::{ComfortRating, TemperatureUnit};

    #[test]
    fn frames_page_to_width() {
        let mut display = ConsoleDisplay::new(Vec::new(), 24);
        let page = PageDescriptor::Readings {
            temperature: 21.46,
            unit: TemperatureUnit::Celsius,
            humidity_pct: 44.0,
            pressure_hpa: 1009.44,
        };
        display.render(&page).unwrap();
        let text = String::from_utf8(display.into_inner()).unwrap();
        insta::assert_snapshot!(text.trim_end(), @r###"
        +----------------------+
        | Readings             |
        +----------------------+
        | Temp: 21.5 C         |
        | Humidity: 44.0 %     |
        | Pressure: 1009.4 hPa |
        +----------------------+
        "###);
    }

    #[test]
    fn clips_long_lines() {
        let mut display = ConsoleDisplay::new(Vec::new(), 16);
        let page = PageDescriptor::Recommendations {
            rating: ComfortRating::Fair,
            advice: vec!["Too dry - humidify"],
        };
        display.render(&page).unwrap();
        let text = String::from_utf8(display.into_inner()).unwrap();
        assert!(text.lines().all(|l| l.chars().count() == 16));
        assert!(text.contains("| Too dry - hu |"));
    }

    #[test]
    fn clear_blanks_screen() {
        let mut display = ConsoleDisplay::new(Vec::new(), DEFAULT_WIDTH);
        display.clear().unwrap();
        assert_eq!(display.into_inner(), b"\x1b[2J\x1b[H");
    }
}
