//! Console level bars.
//! Redraws one line per reading: a bar per axis, green when that axis is level.

use std::io::{self, stdout, Write};

use crossterm::{cursor, queue, style, terminal};
use tilt_tone::{
    feedback::{LevelListener, LevelReading},
    misc::buf_writer::FrameWriter,
};

const FILLED: &str = "█";
const EMPTY: &str = "░";

pub struct LevelDisplay {
    tolerance: f32,
    width: usize,
}

impl LevelDisplay {
    pub fn new(tolerance: f32, width: usize) -> Self {
        Self { tolerance, width }
    }

    fn render(&self, pitch: f32, roll: f32) -> io::Result<()> {
        let mut out = FrameWriter::new(stdout());
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;

        for (label, angle) in [("pitch", pitch), ("roll", roll)] {
            let reading = LevelReading::new(angle, self.tolerance);
            let color = match reading.is_level() {
                true => style::Color::Green,
                false => style::Color::Red,
            };
            let filled = reading.progress() as usize * self.width / 100;

            queue!(
                out,
                style::Print(format!("{label:>5} ")),
                style::SetForegroundColor(color),
                style::Print(FILLED.repeat(filled)),
                style::Print(EMPTY.repeat(self.width - filled)),
                style::ResetColor,
                style::Print(format!(" {angle:>6.1}°  ")),
            )?;
        }

        out.flush()
    }
}

impl LevelListener for LevelDisplay {
    fn on_level_changed(&mut self, pitch: f32, roll: f32) {
        // A broken terminal shouldn't stop the audio feedback
        let _ = self.render(pitch, roll);
    }
}
