/// Startup construction of the live provider set
///
/// One provider per configured endpoint, each probed with a cheap
/// latest-block call. Unreachable endpoints are logged and skipped; the
/// process only refuses to start when nothing at all is reachable.
use crate::errors::RpcError;
use crate::logger::{ self, LogTag };
use crate::rpc::client::RpcClient;
use futures::future::join_all;
use std::sync::Arc;

#[derive(Clone)]
pub struct Provider {
    pub url: String,
    pub client: Arc<RpcClient>,
}

impl Provider {
    pub fn new(url: String, client: Arc<RpcClient>) -> Self {
        Self { url, client }
    }
}

/// Probe every configured endpoint concurrently and keep the survivors
pub async fn connect_providers(
    urls: &[String],
    client: Arc<RpcClient>
) -> Result<Vec<Provider>, RpcError> {
    let probes = urls.iter().map(|url| {
        let client = Arc::clone(&client);
        async move {
            match client.block_number(url).await {
                Ok(height) => {
                    logger::info(
                        LogTag::Rpc,
                        &format!("Connected to RPC {} (block {})", url, height)
                    );
                    Some(Provider::new(url.clone(), client))
                }
                Err(e) => {
                    logger::warning(LogTag::Rpc, &format!("Failed to connect to RPC {}: {}", url, e));
                    None
                }
            }
        }
    });

    let providers: Vec<Provider> = join_all(probes).await.into_iter().flatten().collect();

    if providers.is_empty() {
        return Err(RpcError::NoProviders {
            configured: urls.len(),
        });
    }

    logger::info(
        LogTag::Rpc,
        &format!("Connected to {}/{} RPC nodes", providers.len(), urls.len())
    );

    Ok(providers)
}
