//! Request and response bodies shared by the daemon and its clients.

use crate::*;

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub poll_name: String,
    pub choices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub voter_name: String,
}

/// Body of close and delete requests
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatorTokenRequest {
    pub creator_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyShareRequest {
    pub public_key_share: BigNum,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub votes: Vec<Ciphertext>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionSharesRequest {
    pub decryption_shares: Vec<BigNum>,
}

/// A plain `{"message": ...}` body, used for acknowledgements and errors
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<M: Into<String>>(message: M) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        let req: CreatePollRequest =
            serde_json::from_str(r#"{"pollName":"P","choices":["A","B"]}"#).unwrap();
        assert_eq!(req.poll_name, "P");
        assert!(req.max_participants.is_none());

        let req: VoteRequest =
            serde_json::from_str(r#"{"votes":[{"c1":"12","c2":"34"}]}"#).unwrap();
        assert_eq!(req.votes[0].c2, BigNum::from(34));

        let req: DecryptionSharesRequest =
            serde_json::from_str(r#"{"decryptionShares":["1","2"]}"#).unwrap();
        assert_eq!(req.decryption_shares.len(), 2);

        let bad: Result<PublicKeyShareRequest, _> =
            serde_json::from_str(r#"{"publicKeyShare":"12ab"}"#);
        assert!(bad.is_err());
    }
}
