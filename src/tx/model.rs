//! Transaction data model
//!
//! A `Note` is spendable value already confirmed on-chain. A `Seed` is one
//! promised payment output. A `Spend` bundles seeds with a fee and collects
//! signatures over a digest that never changes as signatures are added. An
//! `Input` consumes one note and one spend; a `RawTx` assembles inputs into
//! the final broadcastable artifact.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{digest_parts, Digest};
use crate::crypto::sign::{sign_digest, PrivateKey, PublicKey, Signature};
use crate::error::{WalletError, WalletResult};

/// An unspent output reference, constructed from externally-fetched chain
/// data. Immutable; consumed when building a spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Schema version (0, 1, or 2)
    pub version: u8,
    /// Block height where the note was created
    pub origin_page: u64,
    /// Minimum timelock block height
    pub timelock_min: Option<u64>,
    /// Maximum timelock block height
    pub timelock_max: Option<u64>,
    /// First digest of the note's name
    pub name_first: Digest,
    /// Last digest of the note's name
    pub name_last: Digest,
    /// Public keys authorized to spend this note
    pub lock_pubkeys: Vec<PublicKey>,
    /// How many signatures are needed (multisig threshold)
    pub lock_keys_required: u64,
    /// Hash of the source transaction
    pub source_hash: Digest,
    /// Whether the source transaction was a coinbase
    pub source_is_coinbase: bool,
    /// Amount in nicks
    pub assets: u64,
}

impl Note {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u8,
        origin_page: u64,
        timelock_min: Option<u64>,
        timelock_max: Option<u64>,
        name_first: Digest,
        name_last: Digest,
        lock_pubkeys: Vec<PublicKey>,
        lock_keys_required: u64,
        source_hash: Digest,
        source_is_coinbase: bool,
        assets: u64,
    ) -> WalletResult<Self> {
        if version > 2 {
            return Err(WalletError::invalid_input(format!(
                "Unknown note version {}",
                version
            )));
        }
        if lock_keys_required == 0 || lock_keys_required > lock_pubkeys.len() as u64 {
            return Err(WalletError::invalid_input(format!(
                "Signature threshold {} impossible with {} lock keys",
                lock_keys_required,
                lock_pubkeys.len()
            )));
        }
        Ok(Self {
            version,
            origin_page,
            timelock_min,
            timelock_max,
            name_first,
            name_last,
            lock_pubkeys,
            lock_keys_required,
            source_hash,
            source_is_coinbase,
            assets,
        })
    }
}

/// One promised payment output, created by the builder and consumed into a
/// spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Recipient's public key
    pub recipient_pubkey: PublicKey,
    /// Amount in nicks
    pub amount: u64,
    /// Links the seed to the note funding it
    pub parent_hash: Digest,
    /// Relative timelock window, if any
    pub relative_min: Option<u64>,
    pub relative_max: Option<u64>,
}

impl Seed {
    pub fn new(recipient_pubkey: PublicKey, amount: u64, parent_hash: Digest) -> WalletResult<Self> {
        Self::with_timelock(recipient_pubkey, amount, parent_hash, None, None)
    }

    pub fn with_timelock(
        recipient_pubkey: PublicKey,
        amount: u64,
        parent_hash: Digest,
        relative_min: Option<u64>,
        relative_max: Option<u64>,
    ) -> WalletResult<Self> {
        if amount == 0 {
            return Err(WalletError::invalid_input("Seed amount must be positive"));
        }
        Ok(Self {
            recipient_pubkey,
            amount,
            parent_hash,
            relative_min,
            relative_max,
        })
    }

    /// Digest of this seed's content
    pub fn hash(&self) -> Digest {
        digest_parts(&[
            self.recipient_pubkey.as_bytes(),
            &self.amount.to_le_bytes(),
            self.parent_hash.as_bytes(),
            &encode_opt(self.relative_min),
            &encode_opt(self.relative_max),
        ])
    }
}

fn encode_opt(v: Option<u64>) -> [u8; 9] {
    let mut out = [0u8; 9];
    if let Some(v) = v {
        out[0] = 1;
        out[1..].copy_from_slice(&v.to_le_bytes());
    }
    out
}

/// A bundle of seeds plus a fee, accumulating signatures
///
/// The signing digest covers only the seeds and fee, so it stays stable as
/// signatures are added; multisig participants all sign the same digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spend {
    seeds: Vec<Seed>,
    fee: u64,
    signatures: Vec<(PublicKey, Signature)>,
}

impl Spend {
    pub fn new(seeds: Vec<Seed>, fee: u64) -> Self {
        Self {
            seeds,
            fee,
            signatures: Vec::new(),
        }
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// The digest multisig participants sign
    pub fn signing_digest(&self) -> Digest {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(self.seeds.len() + 1);
        for seed in &self.seeds {
            parts.push(seed.hash().as_bytes().to_vec());
        }
        parts.push(self.fee.to_le_bytes().to_vec());
        let refs: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        digest_parts(&refs)
    }

    /// Attach an externally-produced signature keyed to a public key
    ///
    /// One call adds one signature; multisig completion takes repeated calls
    /// until the note's threshold is met.
    pub fn add_signature(&mut self, public_key: PublicKey, signature: Signature) {
        // Re-signing with the same key replaces, not duplicates
        self.signatures.retain(|(pk, _)| pk != &public_key);
        self.signatures.push((public_key, signature));
    }

    /// Sign the spend's digest with a private key and attach the result
    pub fn sign(&mut self, private_key: &PrivateKey) -> WalletResult<()> {
        let signature = sign_digest(private_key, &self.signing_digest())?;
        self.add_signature(private_key.public_key(), signature);
        Ok(())
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn signatures(&self) -> &[(PublicKey, Signature)] {
        &self.signatures
    }
}

/// The binding of one note to the spend that satisfies it
///
/// Takes ownership of both; neither can be reused in another input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    note: Note,
    spend: Spend,
}

impl Input {
    pub fn new(note: Note, spend: Spend) -> Self {
        Self { note, spend }
    }

    /// The input's value (amount from the note)
    pub fn value(&self) -> u64 {
        self.note.assets
    }

    /// The fee from the spend
    pub fn fee(&self) -> u64 {
        self.spend.fee
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn spend(&self) -> &Spend {
        &self.spend
    }

    /// Whether accumulated signatures meet the note's threshold
    pub fn is_fully_signed(&self) -> bool {
        self.spend.signature_count() as u64 >= self.note.lock_keys_required
    }
}

/// A complete transaction, ready to serialize for broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTx {
    tx_id: Digest,
    inputs: Vec<Input>,
}

impl RawTx {
    /// Assemble a transaction from a finalized list of inputs
    ///
    /// The transaction id is a digest over all input content: any changed
    /// byte in any input changes the id.
    pub fn new(inputs: Vec<Input>) -> WalletResult<Self> {
        if inputs.is_empty() {
            return Err(WalletError::invalid_input(
                "A transaction requires at least one input",
            ));
        }

        let mut encoded: Vec<Vec<u8>> = Vec::with_capacity(inputs.len());
        for input in &inputs {
            encoded.push(
                bincode::serialize(input)
                    .map_err(|e| WalletError::internal(format!("Input encoding failed: {}", e)))?,
            );
        }
        let refs: Vec<&[u8]> = encoded.iter().map(|e| e.as_slice()).collect();
        let tx_id = digest_parts(&refs);

        Ok(Self { tx_id, inputs })
    }

    pub fn tx_id(&self) -> Digest {
        self.tx_id
    }

    /// Sum of each input's spend fee
    pub fn total_fees(&self) -> u64 {
        self.inputs.iter().map(|i| i.fee()).sum()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Serialize to network wire bytes
    pub fn serialize(&self) -> WalletResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| WalletError::internal(format!("Transaction encoding failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::digest;

    fn keypair(seed: u8) -> (PrivateKey, PublicKey) {
        let private = PrivateKey::from_bytes(&[seed; 32]).unwrap();
        let public = private.public_key();
        (private, public)
    }

    fn test_note(owner: PublicKey, assets: u64) -> Note {
        Note::new(
            0,
            100,
            None,
            None,
            digest(b"name-first"),
            digest(b"name-last"),
            vec![owner],
            1,
            digest(b"source-tx"),
            false,
            assets,
        )
        .unwrap()
    }

    #[test]
    fn test_seed_rejects_zero_amount() {
        let (_, public) = keypair(1);
        assert!(Seed::new(public, 0, digest(b"parent")).is_err());
    }

    #[test]
    fn test_note_rejects_impossible_threshold() {
        let (_, public) = keypair(1);
        let result = Note::new(
            0,
            1,
            None,
            None,
            digest(b"a"),
            digest(b"b"),
            vec![public],
            2,
            digest(b"c"),
            false,
            10,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_signing_digest_stable_under_signatures() {
        let (private, public) = keypair(2);
        let seed = Seed::new(public, 50, digest(b"parent")).unwrap();
        let mut spend = Spend::new(vec![seed], 5);

        let before = spend.signing_digest();
        spend.sign(&private).unwrap();
        assert_eq!(spend.signing_digest(), before);
        assert_eq!(spend.signature_count(), 1);
    }

    #[test]
    fn test_resigning_replaces_not_duplicates() {
        let (private, public) = keypair(3);
        let seed = Seed::new(public, 50, digest(b"parent")).unwrap();
        let mut spend = Spend::new(vec![seed], 5);

        spend.sign(&private).unwrap();
        spend.sign(&private).unwrap();
        assert_eq!(spend.signature_count(), 1);
    }

    #[test]
    fn test_multisig_threshold() {
        let (private_a, public_a) = keypair(4);
        let (private_b, public_b) = keypair(5);

        let mut note = test_note(public_a, 100);
        note.lock_pubkeys = vec![public_a, public_b];
        note.lock_keys_required = 2;

        let seed = Seed::new(public_b, 90, digest(b"parent")).unwrap();
        let mut spend = Spend::new(vec![seed], 10);
        spend.sign(&private_a).unwrap();

        let partially = Input::new(note.clone(), spend.clone());
        assert!(!partially.is_fully_signed());

        spend.sign(&private_b).unwrap();
        let fully = Input::new(note, spend);
        assert!(fully.is_fully_signed());
    }

    #[test]
    fn test_tx_id_changes_with_input_content() {
        let (private, public) = keypair(6);
        let note = test_note(public, 100);

        let mut spend = Spend::new(vec![Seed::new(public, 90, digest(b"p")).unwrap()], 10);
        spend.sign(&private).unwrap();
        let tx_a = RawTx::new(vec![Input::new(note.clone(), spend)]).unwrap();

        let mut other = Spend::new(vec![Seed::new(public, 80, digest(b"p")).unwrap()], 20);
        other.sign(&private).unwrap();
        let tx_b = RawTx::new(vec![Input::new(note, other)]).unwrap();

        assert_ne!(tx_a.tx_id(), tx_b.tx_id());
    }

    #[test]
    fn test_empty_transaction_rejected() {
        assert!(RawTx::new(Vec::new()).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let (private, public) = keypair(7);
        let note = test_note(public, 100);
        let mut spend = Spend::new(vec![Seed::new(public, 90, digest(b"p")).unwrap()], 10);
        spend.sign(&private).unwrap();

        let tx = RawTx::new(vec![Input::new(note, spend)]).unwrap();
        let bytes = tx.serialize().unwrap();
        let decoded: RawTx = bincode::deserialize(&bytes).unwrap();

        assert_eq!(decoded.tx_id(), tx.tx_id());
        assert_eq!(decoded.total_fees(), 10);
    }
}
