use async_trait::async_trait;

use crate::document::PrintDocument;
use crate::error::TransportError;
#[cfg(test)]
use crate::job::Orientation;
use crate::job::PrinterProfile;
#[cfg(test)]
use std::collections::HashMap;

/// Session state of a print transport.
/// 列印傳輸工作階段的狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Authenticating,
    Connected,
}

/// Abstraction over the local print broker.
/// 本機列印代理程式的抽象介面。
#[async_trait]
pub trait PrintTransport: Send {
    fn state(&self) -> SessionState;

    /// Authenticates once per session; a no-op while connected.
    /// 每個工作階段驗證一次；已連線時不做任何事。
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Submits one document to the device named by `profile`, connecting on demand.
    /// 將文件送往 `profile` 指定的印表機，必要時先行連線。
    async fn submit(
        &mut self,
        document: &PrintDocument,
        profile: &PrinterProfile,
    ) -> Result<(), TransportError>;

    async fn disconnect(&mut self);
}

/// Submission recorded by the mock transport.
/// 模擬傳輸層所記錄的送出內容。
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub printer: String,
    pub pages: usize,
    pub width_mm: f64,
    pub height_mm: f64,
    pub orientation: Orientation,
}

/// In-memory implementation of [`PrintTransport`] used for tests.
/// 測試使用的記憶體內部傳輸實作。
#[cfg(test)]
#[derive(Debug)]
pub struct MockTransport {
    state: SessionState,
    pub connects: usize,
    pub connect_attempts: usize,
    pub submissions: Vec<RecordedSubmission>,
    pub connect_error: Option<TransportError>,
    pub rejections: HashMap<String, String>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            connects: 0,
            connect_attempts: 0,
            submissions: Vec::new(),
            connect_error: None,
            rejections: HashMap::new(),
        }
    }

    pub fn reject(mut self, printer: &str, reason: &str) -> Self {
        self.rejections.insert(printer.to_string(), reason.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl PrintTransport for MockTransport {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state == SessionState::Connected {
            return Ok(());
        }
        self.connect_attempts += 1;
        if let Some(err) = self.connect_error.clone() {
            self.state = SessionState::Disconnected;
            return Err(err);
        }
        self.connects += 1;
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn submit(
        &mut self,
        document: &PrintDocument,
        profile: &PrinterProfile,
    ) -> Result<(), TransportError> {
        self.connect().await?;
        if let Some(reason) = self.rejections.get(&profile.name) {
            return Err(TransportError::Rejected(reason.clone()));
        }
        self.submissions.push(RecordedSubmission {
            printer: profile.name.clone(),
            pages: document.page_count(),
            width_mm: document.width_mm(),
            height_mm: document.height_mm(),
            orientation: profile.orientation,
        });
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.state = SessionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::assemble;
    use crate::raster::RasterPage;

    fn document() -> PrintDocument {
        let raster = RasterPage {
            width_px: 2,
            height_px: 2,
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
        };
        assemble(vec![raster], 50.0, 30.0).unwrap()
    }

    #[tokio::test]
    async fn mock_transport_connects_once_per_session() {
        let mut transport = MockTransport::new();
        let profile = PrinterProfile::new("Zebra", 50.0, 30.0, Orientation::Portrait);
        transport.submit(&document(), &profile).await.unwrap();
        transport.submit(&document(), &profile).await.unwrap();

        assert_eq!(transport.state(), SessionState::Connected);
        assert_eq!(transport.connects, 1);
        assert_eq!(transport.submissions.len(), 2);
        assert_eq!(transport.submissions[0].width_mm, 50.0);

        transport.disconnect().await;
        assert_eq!(transport.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn mock_transport_records_rejections() {
        let mut transport = MockTransport::new().reject("Zebra", "printer offline");
        let profile = PrinterProfile::new("Zebra", 50.0, 30.0, Orientation::Portrait);
        let err = transport.submit(&document(), &profile).await.unwrap_err();
        assert_eq!(err, TransportError::Rejected("printer offline".into()));
        assert!(transport.submissions.is_empty());
    }
}
