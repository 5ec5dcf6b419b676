use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::InterlockError;

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true};\n";
const POLL_COMMAND: &[u8] = b"?POLL;\n";

// gpsd reports mode 2 for a 2D fix and 3 for 3D.
const MIN_FIX_MODE: u8 = 2;

#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    tpv: Vec<Tpv>,
}

#[derive(Debug, Deserialize)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GpsdClient {
    addr: String,
    timeout: Duration,
}

impl GpsdClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub async fn current(&self) -> Result<(f64, f64), InterlockError> {
        tokio::time::timeout(self.timeout, self.poll())
            .await
            .map_err(|_| unavailable(format!("gpsd did not answer within {:?}", self.timeout)))?
    }

    async fn poll(&self) -> Result<(f64, f64), InterlockError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| unavailable(format!("failed to connect to gpsd at {}: {e}", self.addr)))?;
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| unavailable(format!("failed to send WATCH: {e}")))?;
        writer
            .write_all(POLL_COMMAND)
            .await
            .map_err(|e| unavailable(format!("failed to send POLL: {e}")))?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| unavailable(format!("failed to read from gpsd: {e}")))?
        {
            if let Some(fix) = parse_poll(&line) {
                return fix;
            }
        }

        Err(unavailable("gpsd closed the connection".to_string()))
    }
}

pub fn parse_poll(line: &str) -> Option<Result<(f64, f64), InterlockError>> {
    let report: Report = serde_json::from_str(line).ok()?;
    if report.class != "POLL" {
        return None;
    }

    let fix = report
        .tpv
        .iter()
        .filter(|tpv| tpv.mode >= MIN_FIX_MODE)
        .find_map(|tpv| Some((tpv.lat?, tpv.lon?)));

    Some(fix.ok_or_else(|| unavailable("no position fix".to_string())))
}

fn unavailable(reason: String) -> InterlockError {
    InterlockError::GeoLocationUnavailable(reason)
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    const POLL_WITH_FIX: &str = r#"{"class":"POLL","time":"2024-05-01T09:00:00.000Z","active":1,"tpv":[{"class":"TPV","device":"/dev/ttyACM0","mode":3,"lat":37.5665,"lon":126.978}],"sky":[]}"#;
    const POLL_NO_FIX: &str = r#"{"class":"POLL","active":1,"tpv":[{"class":"TPV","mode":1}]}"#;
    const VERSION: &str = r#"{"class":"VERSION","release":"3.22","rev":"3.22","proto_major":3,"proto_minor":14}"#;

    #[test]
    fn test_parse_poll_with_fix() {
        let fix = parse_poll(POLL_WITH_FIX).unwrap().unwrap();
        assert_eq!(fix, (37.5665, 126.978));
    }

    #[test]
    fn test_parse_poll_without_fix() {
        assert!(matches!(
            parse_poll(POLL_NO_FIX),
            Some(Err(InterlockError::GeoLocationUnavailable(_)))
        ));
    }

    #[test]
    fn test_parse_poll_skips_other_reports() {
        assert!(parse_poll(VERSION).is_none());
        assert!(parse_poll("not json").is_none());
    }

    #[tokio::test]
    async fn test_current_reads_poll_answer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(format!("{VERSION}\n").as_bytes()).await.unwrap();
            let mut request = [0u8; 64];
            let _ = socket.read(&mut request).await.unwrap();
            socket.write_all(format!("{POLL_WITH_FIX}\n").as_bytes()).await.unwrap();
        });

        let client = GpsdClient::new(addr.to_string(), Duration::from_secs(2));
        assert_eq!(client.current().await.unwrap(), (37.5665, 126.978));
    }

    #[tokio::test]
    async fn test_current_without_gpsd_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GpsdClient::new(addr.to_string(), Duration::from_secs(2));
        assert!(matches!(
            client.current().await,
            Err(InterlockError::GeoLocationUnavailable(_))
        ));
    }
}
