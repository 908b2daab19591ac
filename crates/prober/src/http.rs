use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use tagscan_engine::{Probe, ProbeError, ProbeReply};
use tagscan_hashdb::FingerprintDb;

use crate::error::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// a plain browser UA; some deployments serve bots a WAF page instead
// of the asset
const USER_AGENT: &str = "Mozilla/5.0 (X11; CrOS i686 2268.111.0) AppleWebKit/536.11 (KHTML, like Gecko) Chrome/20.0.1132.57 Safari/536.11";

const IMAGE_EXTENSIONS: &[&str] = &[".jpeg", ".jpg", ".gif", ".png"];

/// Default probe: fetch `{target}/{file}`, digest the normalized body
/// and translate the digest into database tags.
pub struct HttpFingerprintProbe {
    client: reqwest::Client,
    db: Arc<FingerprintDb>,
}

impl HttpFingerprintProbe {
    /// Build with the default client: short per-request timeout,
    /// invalid certificates tolerated (fingerprinting a host is not
    /// trusting it), browser user agent.
    pub fn new(db: Arc<FingerprintDb>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::with_client(db, client))
    }

    /// Build over a caller-supplied client.
    pub fn with_client(db: Arc<FingerprintDb>, client: reqwest::Client) -> Self {
        Self { client, db }
    }
}

#[async_trait]
impl Probe for HttpFingerprintProbe {
    async fn probe(
        &self,
        target: &str,
        file: &str,
    ) -> std::result::Result<ProbeReply, ProbeError> {
        let url = format!("{}/{}", target.trim_end_matches('/'), file);

        let response = self.client.get(&url).send().await.map_err(classify)?;
        let status = response.status().as_u16();

        if status != 200 {
            log::debug!("({status}) {url}");
            return Ok(ProbeReply::miss(status));
        }

        let body = response.bytes().await.map_err(classify)?;
        let digest = body_digest(file, &body);
        log::debug!("(200) {url} [{digest}]");

        let tags = match self.db.tags_for(file, &digest) {
            Ok(tags) => tags.to_vec(),
            Err(err) => {
                // served, but not a body any known release ships
                log::debug!("{url}: {err}");
                Vec::new()
            }
        };

        Ok(ProbeReply { tags, status: 200 })
    }
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_connect() {
        ProbeError::Unreachable(err.to_string())
    } else {
        ProbeError::Other(err.to_string())
    }
}

/// MD5 hex of the body with every `\r` stripped, so fingerprints
/// survive deployments that rewrite line endings. Images are digested
/// as-is.
pub fn body_digest(file: &str, body: &[u8]) -> String {
    let mut hasher = Md5::new();

    if is_image(file) {
        hasher.update(body);
    } else {
        for chunk in body.split(|b| *b == b'\r') {
            hasher.update(chunk);
        }
    }

    hex::encode(hasher.finalize())
}

fn is_image(file: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|ext| file.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_HELLO: &str = "5d41402abc4b2a76b9719d911017c592";

    #[test]
    fn test_digest_strips_carriage_returns_in_text() {
        assert_eq!(body_digest("readme.txt", b"hello"), MD5_HELLO);
        assert_eq!(body_digest("readme.txt", b"hel\rlo"), MD5_HELLO);
        assert_eq!(body_digest("readme.txt", b"\rhe\r\rllo\r"), MD5_HELLO);
    }

    #[test]
    fn test_digest_leaves_images_untouched() {
        assert_eq!(body_digest("logo.png", b"hello"), MD5_HELLO);
        assert_ne!(body_digest("logo.png", b"hel\rlo"), MD5_HELLO);
        assert_ne!(body_digest("photo.jpg", b"hel\rlo"), MD5_HELLO);
    }
}
