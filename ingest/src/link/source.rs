use crate::generator::sweep;
use crate::workflow::config::LinkSource;
use radarcore::prelude::LinkError;
use tokio::io::AsyncRead;

/// Byte stream carrying newline-delimited sensor text.
pub type SensorStream = Box<dyn AsyncRead + Send + Unpin>;

pub async fn open(source: &LinkSource) -> Result<SensorStream, LinkError> {
    let transport = |err: std::io::Error| {
        LinkError::Transport(format!("opening {}: {}", source.label(), err))
    };
    match source {
        LinkSource::Device { path, .. } => {
            let file = tokio::fs::File::open(path).await.map_err(transport)?;
            Ok(Box::new(file))
        }
        LinkSource::Tcp { address } => {
            let stream = tokio::net::TcpStream::connect(address)
                .await
                .map_err(transport)?;
            Ok(Box::new(stream))
        }
        LinkSource::Stdin => Ok(Box::new(tokio::io::stdin())),
        LinkSource::Synthetic(config) => Ok(Box::new(sweep::spawn(config.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn missing_device_is_a_transport_error() {
        let source = LinkSource::Device {
            path: PathBuf::from("/nonexistent/tty-radar"),
            baud_rate: 9600,
        };
        match open(&source).await {
            Err(LinkError::Transport(detail)) => assert!(detail.contains("/nonexistent/tty-radar")),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("device should not open"),
        }
    }
}
