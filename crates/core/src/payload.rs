//! Canonical cross-ledger notification payload.
//!
//! The origin publisher ABI-encodes this message; the dispatcher decodes
//! it. Field order is part of the wire contract and must never change.

use alloy_primitives::{keccak256, B256};
use alloy_sol_types::{sol, SolValue};

sol! {
    /// The 7-field price update notification, in canonical wire order.
    #[derive(Debug, PartialEq, Eq)]
    struct PriceUpdate {
        uint64 round_id;
        int128 answer;
        uint64 updated_at;
        uint8 decimals;
        string description;
        uint64 destination_chain_id;
        uint64 version;
    }
}

impl PriceUpdate {
    /// ABI-encode the payload for transport.
    pub fn encode(&self) -> Vec<u8> {
        self.abi_encode()
    }

    /// Decode a payload from its ABI encoding.
    pub fn decode(data: &[u8]) -> alloy_sol_types::Result<Self> {
        Self::abi_decode(data, true)
    }

    /// Signature of the on-ledger event carrying this payload, used when
    /// subscribing the dispatcher to an origin publisher.
    pub fn event_signature() -> B256 {
        keccak256(b"PriceUpdateEmitted(uint64,int128,uint64,uint8,string,uint64,uint64)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_preserves_fields() {
        let update = PriceUpdate {
            round_id: 7,
            answer: 200_000_000_000,
            updated_at: 1_700_000_000,
            decimals: 8,
            description: "ETH/USD".to_string(),
            destination_chain_id: 84532,
            version: 1,
        };

        let decoded = PriceUpdate::decode(&update.encode()).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(PriceUpdate::decode(&[0x01, 0x02, 0x03]).is_err());
        assert!(PriceUpdate::decode(&[]).is_err());
    }
}
