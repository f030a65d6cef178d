use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The server couldn't fulfill the request for {url}. Error code: {status}")]
    RemoteFetch { status: u16, url: String },

    #[error("Could not open URL \"{url}\": {source}")]
    RemoteUnreachable {
        url: String,
        source: reqwest::Error,
    },

    #[error(
        "Layer {layer_name} was not found in WxS contents on server {server_url}.\n\
         WCS contents: {wcs_contents}\n\
         WFS contents: {wfs_contents}"
    )]
    LayerNotFound {
        layer_name: String,
        server_url: String,
        wcs_contents: String,
        wfs_contents: String,
    },

    #[error("Invalid {service} capabilities document: {detail}")]
    Capabilities {
        service: &'static str,
        detail: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::RemoteFetch { .. } => "remote.fetch_failed",
            Error::RemoteUnreachable { .. } => "remote.unreachable",
            Error::LayerNotFound { .. } => "layer.not_found",
            Error::Capabilities { .. } => "ows.invalid_capabilities",
            Error::Http(_) => "remote.client_error",
            Error::Io(_) => "internal.io_error",
        }
    }

    pub(crate) fn unreachable(url: &str, source: reqwest::Error) -> Error {
        Error::RemoteUnreachable {
            url: url.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_fetch_message_contains_status_code() {
        let err = Error::RemoteFetch {
            status: 404,
            url: "http://localhost/page".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert_eq!(err.code(), "remote.fetch_failed");
    }

    #[test]
    fn layer_not_found_message_contains_layer_and_server() {
        let err = Error::LayerNotFound {
            layer_name: "base:nic_admin".to_string(),
            server_url: "http://localhost:8001/geoserver/ows".to_string(),
            wcs_contents: "[]".to_string(),
            wfs_contents: "[base:roads]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("base:nic_admin"));
        assert!(msg.contains("http://localhost:8001/geoserver/ows"));
        assert!(msg.contains("base:roads"));
        assert_eq!(err.code(), "layer.not_found");
    }
}
