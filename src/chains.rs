use crate::settings::ChainSettings;
use anyhow::Context;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Static per-chain configuration, looked up by numeric chain id.
#[derive(Debug, Clone)]
pub struct Chain {
    pub id: u64,
    pub name: String,
    pub rpc_url: Url,
    pub explorer_api_url: Url,
    pub explorer_api_key: String,
    pub block_explorer_url: Url,
}

impl Chain {
    pub fn address_url(&self, address: &str) -> String {
        format!(
            "{}address/{}",
            ensure_trailing_slash(&self.block_explorer_url),
            address
        )
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!(
            "{}tx/{}",
            ensure_trailing_slash(&self.block_explorer_url),
            tx_hash
        )
    }
}

fn ensure_trailing_slash(url: &Url) -> String {
    let url = url.as_str();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[derive(Error, Debug)]
#[error("unknown chain id: {0}")]
pub struct UnknownChain(pub u64);

#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, Chain>,
}

impl ChainRegistry {
    pub fn from_chains(chains: impl IntoIterator<Item = Chain>) -> Self {
        Self {
            chains: chains.into_iter().map(|chain| (chain.id, chain)).collect(),
        }
    }

    pub fn from_settings(settings: &BTreeMap<String, ChainSettings>) -> anyhow::Result<Self> {
        let chains = settings
            .iter()
            .map(|(id, chain)| {
                let id: u64 = id
                    .parse()
                    .with_context(|| format!("chain id {id:?} is not a decimal number"))?;
                Ok(Chain {
                    id,
                    name: chain.name.clone(),
                    rpc_url: chain.rpc_url.clone(),
                    explorer_api_url: chain.explorer_api_url.clone(),
                    explorer_api_key: chain.explorer_api_key.clone(),
                    block_explorer_url: chain.block_explorer_url.clone(),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::from_chains(chains))
    }

    pub fn get(&self, id: u64) -> Result<&Chain, UnknownChain> {
        self.chains.get(&id).ok_or(UnknownChain(id))
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
