use crate::settings::IpfsSettings;
use anyhow::{anyhow, Context};
use ethers_solc::{artifacts::Sources, CompilerInput};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

// `add` streams one JSON object per line; the wrapping directory entry has
// an empty name.
#[derive(Debug, Deserialize)]
struct AddedFile {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

/// Uploads build artifacts to an IPFS HTTP API as one logical directory.
/// Upload failure is soft: callers get `None` and the deployment proceeds,
/// only artifact browsing is lost.
pub struct IpfsClient {
    client: reqwest::Client,
    enabled: bool,
    api_url: Url,
    gateway_url: Url,
}

impl IpfsClient {
    pub fn new(client: reqwest::Client, settings: &IpfsSettings) -> Self {
        Self {
            client,
            enabled: settings.enabled,
            api_url: settings.api_url.clone(),
            gateway_url: settings.gateway_url.clone(),
        }
    }

    pub async fn upload(
        &self,
        sources: &Sources,
        abi: &serde_json::Value,
        bytecode: &str,
        standard_json_input: &CompilerInput,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }
        match self
            .try_upload(sources, abi, bytecode, standard_json_input)
            .await
        {
            Ok(cid) => Some(cid),
            Err(err) => {
                tracing::warn!(err = ?err, "artifact upload failed, continuing without cid");
                None
            }
        }
    }

    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}ipfs/{}", self.gateway_url, cid)
    }

    async fn try_upload(
        &self,
        sources: &Sources,
        abi: &serde_json::Value,
        bytecode: &str,
        standard_json_input: &CompilerInput,
    ) -> anyhow::Result<String> {
        let mut form = Form::new();
        for (path, source) in sources {
            form = form.part(
                "file",
                Part::text(source.content.as_str().to_owned())
                    .file_name(path.to_string_lossy().into_owned()),
            );
        }
        form = form
            .part(
                "file",
                Part::text(serde_json::to_string_pretty(abi)?).file_name("abi.json"),
            )
            .part(
                "file",
                Part::text(bytecode.to_owned()).file_name("bytecode.txt"),
            )
            .part(
                "file",
                Part::text(serde_json::to_string(standard_json_input)?)
                    .file_name("standardJsonInput.json"),
            );

        let url = self.api_url.join("api/v0/add")?;
        let response = self
            .client
            .post(url)
            .query(&[("wrap-with-directory", "true"), ("cid-version", "1")])
            .multipart(form)
            .send()
            .await
            .context("ipfs add request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ipfs add returned status {status}"));
        }

        let body = response.text().await?;
        let mut directory_cid = None;
        for line in body.lines().filter(|line| !line.trim().is_empty()) {
            let added: AddedFile = serde_json::from_str(line)
                .with_context(|| format!("unexpected ipfs add response line: {line}"))?;
            if added.name.is_empty() {
                directory_cid = Some(added.hash);
            }
        }
        directory_cid.ok_or_else(|| anyhow!("ipfs add response carried no directory cid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(enabled: bool) -> IpfsSettings {
        IpfsSettings {
            enabled,
            api_url: Url::try_from("http://127.0.0.1:5001/").unwrap(),
            gateway_url: Url::try_from("https://ipfs.io/").unwrap(),
            request_timeout: 10,
        }
    }

    #[test]
    fn gateway_urls() {
        let client = IpfsClient::new(reqwest::Client::new(), &settings(true));
        assert_eq!(
            client.gateway_url("bafybeigdyrzt5"),
            "https://ipfs.io/ipfs/bafybeigdyrzt5"
        );
    }

    #[tokio::test]
    async fn disabled_upload_returns_none() {
        let client = IpfsClient::new(reqwest::Client::new(), &settings(false));
        let cid = client
            .upload(
                &Sources::new(),
                &serde_json::Value::Array(vec![]),
                "0x6001",
                &crate::compiler::standard_json_input(Sources::new()),
            )
            .await;
        assert_eq!(cid, None);
    }
}
