//! Client for remote storage nodes (`http://` addresses)

use crate::common::{Error, NodeBackend, Result, StoredDocument};
use crate::node::http::{CountResponse, DeleteResponse, InsertResponse, KeyQuery, MissingResponse};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

/// Request timeout once connected; startup probes use the connect timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct NodeClient {
    client: Client,
    base_url: String,
}

impl NodeClient {
    pub fn connect(address: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(REQUEST_TIMEOUT.max(connect_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: address.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl NodeBackend for NodeClient {
    fn ping(&self) -> Result<()> {
        self.client
            .get(self.url("/health"))
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn insert_one(&self, document: &StoredDocument) -> Result<bool> {
        let response = self
            .client
            .post(self.url("/documents"))
            .json(document)
            .send()?;

        if response.status() == StatusCode::CONFLICT {
            return Err(Error::DuplicateKey(document.key.clone()));
        }

        let body: InsertResponse = response.error_for_status()?.json()?;
        Ok(body.acknowledged)
    }

    fn find_one(&self, key: &str) -> Result<Option<StoredDocument>> {
        let response = self
            .client
            .get(self.url("/documents"))
            .query(&KeyQuery {
                key: key.to_string(),
            })
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            // only a miss reported by the collection means absent; any other
            // 404 (wrong path, not a docshard node) is an error
            return match response.json::<MissingResponse>() {
                Ok(miss) if miss.missing == key => Ok(None),
                _ => Err(Error::Http(format!(
                    "{}: unexpected 404 looking up {:?}",
                    self.base_url, key
                ))),
            };
        }

        Ok(Some(response.error_for_status()?.json()?))
    }

    fn count_all(&self) -> Result<u64> {
        let body: CountResponse = self
            .client
            .get(self.url("/count"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(body.count)
    }

    fn delete_all(&self) -> Result<u64> {
        let body: DeleteResponse = self
            .client
            .delete(self.url("/documents"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(body.deleted)
    }
}
