//! Banner grabbing on freshly connected TCP streams.
//!
//! Banner-first protocols (SSH, SMTP, FTP) are simply read. Plain HTTP ports
//! get a minimal request first. HTTPS is skipped because a plaintext read
//! over TLS yields nothing useful. Every failure path yields an empty banner.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 512;

/// Banners longer than this are cut and suffixed with `...`.
const MAX_BANNER_CHARS: usize = 40;

/// Default read deadline for banner capture.
pub const BANNER_TIMEOUT: Duration = Duration::from_millis(500);

const HTTP_PROBE: &[u8] = b"GET / HTTP/1.1\r\nHost: \r\nConnection: close\r\n\r\n";

/// What to do with a connection before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Approach {
    /// Read whatever the service volunteers.
    Listen,
    /// Send an HTTP request, then read.
    HttpProbe,
    /// Don't read at all.
    Skip,
}

fn approach_for(port: u16) -> Approach {
    match port {
        80 | 8080 => Approach::HttpProbe,
        443 => Approach::Skip,
        _ => Approach::Listen,
    }
}

/// Grab a banner from an already connected stream.
///
/// The whole exchange (probe write and read) is bounded by `read_timeout`.
pub async fn grab_banner<S>(stream: &mut S, port: u16, read_timeout: Duration) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let approach = approach_for(port);
    if approach == Approach::Skip {
        return String::new();
    }

    let exchange = async {
        if approach == Approach::HttpProbe {
            stream.write_all(HTTP_PROBE).await?;
        }
        let mut buffer = [0u8; MAX_BANNER_SIZE];
        let n = stream.read(&mut buffer).await?;
        Ok::<_, std::io::Error>(buffer[..n].to_vec())
    };

    match timeout(read_timeout, exchange).await {
        Ok(Ok(bytes)) if !bytes.is_empty() => clean_banner(&bytes),
        _ => String::new(),
    }
}

/// Flatten line terminators, trim, and cap the length.
fn clean_banner(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data)
        .replace("\r\n", " ")
        .replace('\n', " ");
    let text = text.trim();

    if text.chars().count() > MAX_BANNER_CHARS {
        let cut: String = text.chars().take(MAX_BANNER_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
