use anyhow::{anyhow, Result};
use cryptopoll::*;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A blocking client for the cryptopolld JSON API
pub struct Rest {
    client: Client,
    base_uri: String,
}

impl Rest {
    pub fn new(base_uri: &str) -> Self {
        Rest {
            client: Client::new(),
            base_uri: base_uri.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_uri, path)
    }

    // Non-2xx responses carry a {"message": ...} body
    fn parse<T: DeserializeOwned>(res: Response) -> Result<T> {
        let status = res.status();
        if status.is_success() {
            return Ok(res.json()?);
        }
        let message = res
            .json::<MessageResponse>()
            .map(|m| m.message)
            .unwrap_or_else(|_| "no message".to_owned());
        Err(anyhow!("cryptopoll: server returned {}: {}", status, message))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let res = self.client.post(self.url(path)).json(body).send()?;
        Self::parse(res)
    }

    pub fn health_check(&self) -> Result<String> {
        let res = self
            .client
            .get(format!("{}/health-check", self.base_uri))
            .send()?;
        Ok(res.error_for_status()?.text()?)
    }

    pub fn create_poll(
        &self,
        name: &str,
        choices: Vec<String>,
        max_participants: Option<u32>,
    ) -> Result<CreatedPoll> {
        let req = CreatePollRequest {
            poll_name: name.to_owned(),
            choices,
            max_participants,
        };
        self.post("/polls/create", &req)
    }

    pub fn get_poll(&self, id: PollId) -> Result<PollView> {
        let res = self.client.get(self.url(&format!("/polls/{}", id))).send()?;
        Self::parse(res)
    }

    pub fn delete_poll(&self, id: PollId, creator_token: &str) -> Result<MessageResponse> {
        let req = CreatorTokenRequest {
            creator_token: creator_token.to_owned(),
        };
        let res = self
            .client
            .delete(self.url(&format!("/polls/{}", id)))
            .json(&req)
            .send()?;
        Self::parse(res)
    }

    pub fn register(&self, id: PollId, voter_name: &str) -> Result<MessageResponse> {
        let req = RegisterRequest {
            voter_name: voter_name.to_owned(),
        };
        self.post(&format!("/polls/{}/register", id), &req)
    }

    pub fn close_poll(&self, id: PollId, creator_token: &str) -> Result<MessageResponse> {
        let req = CreatorTokenRequest {
            creator_token: creator_token.to_owned(),
        };
        self.post(&format!("/polls/{}/close", id), &req)
    }

    pub fn submit_public_key_share(&self, id: PollId, share: BigNum) -> Result<MessageResponse> {
        let req = PublicKeyShareRequest {
            public_key_share: share,
        };
        self.post(&format!("/polls/{}/public-key-share", id), &req)
    }

    pub fn submit_vote(&self, id: PollId, votes: Vec<Ciphertext>) -> Result<MessageResponse> {
        self.post(&format!("/polls/{}/vote", id), &VoteRequest { votes })
    }

    pub fn submit_decryption_shares(
        &self,
        id: PollId,
        shares: Vec<BigNum>,
    ) -> Result<MessageResponse> {
        let req = DecryptionSharesRequest {
            decryption_shares: shares,
        };
        self.post(&format!("/polls/{}/decryption-shares", id), &req)
    }
}
