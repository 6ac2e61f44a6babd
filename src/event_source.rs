use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::Duration;

use crate::geometry::{Point, ScrollOffset};
use crate::session::{PRIMARY_BUTTON, PageEvent, Target};

/// One step fed to a page session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionInput {
    Page(PageEvent),
    /// Lets time pass, in milliseconds on the wire.
    Wait(#[serde(with = "millis")] Duration),
    /// Blocks until outstanding analyses have replied.
    AwaitAnalysis,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wait {
        wait_ms: u64,
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let wait_ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Wait { wait_ms }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Wait::deserialize(d).map(|w| Duration::from_millis(w.wait_ms))
    }
}

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Whether another input is available within `timeout`.
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next input
    fn read(&mut self) -> Result<SessionInput>;
}

/// Reads inputs as JSON lines; blank lines and `#` comments are skipped.
///
/// ```text
/// {"type": "pointer_move", "point": {"x": 12.0, "y": 30.0}}
/// {"type": "animation_frame"}
/// {"wait_ms": 300}
/// "await_analysis"
/// ```
pub struct ReaderEventSource<R> {
    reader: R,
    line_no: usize,
    next: Option<SessionInput>,
}

impl<R: BufRead> ReaderEventSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            next: None,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut line = String::new();
        while self.next.is_none() {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.next = Some(parse_input(trimmed).with_context(|| {
                format!("Invalid event on line {}: {trimmed}", self.line_no)
            })?);
        }
        Ok(())
    }
}

fn parse_input(line: &str) -> Result<SessionInput> {
    if line == "\"await_analysis\"" {
        return Ok(SessionInput::AwaitAnalysis);
    }
    Ok(serde_json::from_str(line)?)
}

impl<R: BufRead> EventSource for ReaderEventSource<R> {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        self.fill()?;
        Ok(self.next.is_some())
    }

    fn read(&mut self) -> Result<SessionInput> {
        self.fill()?;
        match self.next.take() {
            Some(input) => Ok(input),
            None => bail!("No more events after line {}", self.line_no),
        }
    }
}

/// Simulated event source for testing
pub struct SimulatedEventSource {
    pub(crate) events: Vec<SessionInput>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<SessionInput>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    /// Pointer movement over the page with no button held.
    pub fn pointer_move(x: f64, y: f64) -> SessionInput {
        SessionInput::Page(PageEvent::PointerMove {
            point: Point::new(x, y),
            buttons: 0,
            target: Target::Page,
        })
    }

    /// Pointer movement with the primary button held.
    pub fn drag_move(x: f64, y: f64) -> SessionInput {
        SessionInput::Page(PageEvent::PointerMove {
            point: Point::new(x, y),
            buttons: 1,
            target: Target::Page,
        })
    }

    pub fn frame() -> SessionInput {
        SessionInput::Page(PageEvent::AnimationFrame)
    }

    pub fn pointer_down(x: f64, y: f64) -> SessionInput {
        SessionInput::Page(PageEvent::PointerDown {
            point: Point::new(x, y),
            target: Target::Page,
        })
    }

    pub fn pointer_up() -> SessionInput {
        SessionInput::Page(PageEvent::PointerUp {
            target: Target::Page,
        })
    }

    /// Primary-button click on the page.
    pub fn click(x: f64, y: f64) -> SessionInput {
        SessionInput::Page(PageEvent::Click {
            point: Point::new(x, y),
            button: PRIMARY_BUTTON,
            target: Target::Page,
        })
    }

    pub fn scroll(x: f64, y: f64) -> SessionInput {
        SessionInput::Page(PageEvent::Scroll {
            offset: ScrollOffset { x, y },
        })
    }

    pub fn wait(ms: u64) -> SessionInput {
        SessionInput::Wait(Duration::from_millis(ms))
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<SessionInput> {
        match self.events.get(self.current_index) {
            Some(event) => {
                self.current_index += 1;
                Ok(event.clone())
            }
            None => bail!("Simulated events exhausted"),
        }
    }
}
