use crate::imports::*;

/*
    Built-in ReportIO sinks:
    * StdoutInteraction - one println! per message
    * BufferedInteraction - keeps every message in memory; clones share the same buffer
*/
pub struct StdoutInteraction;

#[async_trait]
impl ReportIO for StdoutInteraction {
    async fn notify(&self, message: &str) -> Result<()> {
        println!("{message}");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct BufferedInteraction {
    lines: Arc<RwLock<Vec<String>>>,
}

impl BufferedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lines(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }

    pub async fn clear(&self) {
        self.lines.write().await.clear();
    }
}

#[async_trait]
impl ReportIO for BufferedInteraction {
    async fn notify(&self, message: &str) -> Result<()> {
        self.lines.write().await.push(message.to_string());
        Ok(())
    }
}
