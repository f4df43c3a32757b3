/*
    Runner services module:
    * ReportIO is the sink trait reports are written through. The runner never prints directly.
    * RunnerServices holds every registered sink and fans each message out to all of them.

    Built-in sinks live in `io`: stdout for the binary, a buffered sink for callers that want the
    lines back (tests, embedding).
*/
use crate::imports::*;

pub mod io;

#[derive(Clone, Default)]
pub struct RunnerServices {
    io: Vec<Arc<dyn ReportIO>>,
}

impl std::fmt::Debug for RunnerServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerServices")
            .field("io_count", &self.io.len())
            .finish()
    }
}

impl RunnerServices {
    // Builder methods
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_io<T: ReportIO + 'static>(&mut self, io: T) {
        self.io.push(Arc::new(io));
    }

    pub fn with_io<T: ReportIO + 'static>(mut self, io: T) -> Self {
        self.add_io(io);
        self
    }

    pub fn io_count(&self) -> usize {
        self.io.len()
    }

    // Single notify method, applies to all registered IO services
    pub async fn notify(&self, message: &str) -> Result<()> {
        let mut errors = Vec::new();
        for io in &self.io {
            if let Err(e) = io.notify(message).await {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            let msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Err(anyhow::anyhow!("IO service errors: {msg}"))
        }
    }

    pub fn defaults() -> Self {
        Self::new().with_io(io::StdoutInteraction)
    }
}

#[async_trait]
pub trait ReportIO: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}
