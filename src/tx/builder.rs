//! Transaction builder
//!
//! Turns notes, payment outputs, a fee, and a signing key into a fully
//! signed, serialized transaction.
//!
//! Output distribution policy: every requested payment output is attached to
//! the FIRST note's spend; later notes contribute value with an empty seed
//! list. This concentrates outputs on one input and is externally observable
//! on-chain, so it is stated here rather than left implicit.

use crate::crypto::hash::Digest;
use crate::crypto::sign::{sign_digest, PrivateKey, PublicKey};
use crate::error::{WalletError, WalletResult};
use crate::tx::model::{Input, Note, RawTx, Seed, Spend};

/// One requested payment output
#[derive(Debug, Clone)]
pub struct PaymentOutput {
    /// Recipient's public key
    pub recipient_pubkey: PublicKey,
    /// Amount in nicks
    pub amount: u64,
    /// Optional relative timelock window
    pub relative_min: Option<u64>,
    pub relative_max: Option<u64>,
}

impl PaymentOutput {
    pub fn new(recipient_pubkey: PublicKey, amount: u64) -> Self {
        Self {
            recipient_pubkey,
            amount,
            relative_min: None,
            relative_max: None,
        }
    }
}

/// Everything needed to build a transaction
///
/// Keys arrive as raw bytes from the vault boundary and are length-checked
/// here before anything is signed.
#[derive(Debug)]
pub struct TransactionParams<'a> {
    /// Notes (UTXOs) to spend
    pub notes: Vec<Note>,
    /// Payment outputs
    pub outputs: Vec<PaymentOutput>,
    /// Transaction fee in nicks
    pub fee: u64,
    /// Private key for signing (32 bytes)
    pub private_key: &'a [u8],
    /// Public key the signature is keyed to (97 bytes)
    pub public_key: &'a [u8],
}

/// A constructed transaction ready for broadcast
#[derive(Debug, Clone)]
pub struct ConstructedTransaction {
    /// Transaction id (40 bytes)
    pub tx_id: Digest,
    /// Total fees across inputs
    pub total_fees: u64,
    /// Serialized wire bytes
    pub serialized: Vec<u8>,
    /// Number of inputs
    pub input_count: usize,
}

/// Build a complete transaction from notes, outputs, and a fee
pub fn build_transaction(params: &TransactionParams<'_>) -> WalletResult<ConstructedTransaction> {
    if params.notes.is_empty() {
        return Err(WalletError::invalid_input(
            "At least one note (UTXO) is required",
        ));
    }
    if params.outputs.is_empty() {
        return Err(WalletError::invalid_input("At least one output is required"));
    }
    let private_key = PrivateKey::from_bytes(params.private_key)?;
    let public_key = PublicKey::from_bytes(params.public_key)?;

    let total_available = params
        .notes
        .iter()
        .try_fold(0u64, |sum, n| sum.checked_add(n.assets))
        .ok_or_else(|| WalletError::invalid_input("Note total overflows"))?;
    let total_outputs = params
        .outputs
        .iter()
        .try_fold(0u64, |sum, o| sum.checked_add(o.amount))
        .ok_or_else(|| WalletError::invalid_input("Output total overflows"))?;
    let total_needed = total_outputs
        .checked_add(params.fee)
        .ok_or_else(|| WalletError::invalid_input("Output total overflows"))?;

    if total_available < total_needed {
        return Err(WalletError::insufficient_funds(format!(
            "Insufficient funds: have {} nicks, need {} ({} outputs + {} fee)",
            total_available, total_needed, total_outputs, params.fee
        )));
    }

    for note in &params.notes {
        if note.assets == 0 {
            return Err(WalletError::invalid_input(
                "Notes with zero value cannot be spent",
            ));
        }
    }

    let mut inputs = Vec::with_capacity(params.notes.len());
    for (position, note) in params.notes.iter().enumerate() {
        // All payment outputs ride on the first note's spend (see module docs)
        let seeds = if position == 0 {
            params
                .outputs
                .iter()
                .map(|output| {
                    Seed::with_timelock(
                        output.recipient_pubkey,
                        output.amount,
                        note.name_first,
                        output.relative_min,
                        output.relative_max,
                    )
                })
                .collect::<WalletResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let mut spend = Spend::new(seeds, params.fee);
        let signature = sign_digest(&private_key, &spend.signing_digest())?;
        spend.add_signature(public_key, signature);

        inputs.push(Input::new(note.clone(), spend));
    }

    let tx = RawTx::new(inputs)?;
    Ok(ConstructedTransaction {
        tx_id: tx.tx_id(),
        total_fees: tx.total_fees(),
        serialized: tx.serialize()?,
        input_count: tx.input_count(),
    })
}

/// Build a simple single-note payment with optional change back to sender
pub fn build_payment(
    note: &Note,
    recipient_pubkey: &PublicKey,
    amount: u64,
    change_pubkey: &PublicKey,
    fee: u64,
    private_key: &[u8],
    public_key: &[u8],
) -> WalletResult<ConstructedTransaction> {
    let total_needed = amount
        .checked_add(fee)
        .ok_or_else(|| WalletError::invalid_input("Amount overflows"))?;

    if note.assets < total_needed {
        return Err(WalletError::insufficient_funds(format!(
            "Insufficient funds in note: have {} nicks, need {}",
            note.assets, total_needed
        )));
    }

    let mut outputs = vec![PaymentOutput::new(*recipient_pubkey, amount)];

    let change = note.assets - total_needed;
    if change > 0 {
        outputs.push(PaymentOutput::new(*change_pubkey, change));
    }

    build_transaction(&TransactionParams {
        notes: vec![note.clone()],
        outputs,
        fee,
        private_key,
        public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::digest;
    use crate::error::ErrorCode;

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
    fn test_build_simple_transaction() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 100);

        let tx = build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![PaymentOutput::new(recipient, 90)],
            fee: 10,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap();

        assert_eq!(tx.input_count, 1);
        assert_eq!(tx.total_fees, 10);
        assert!(!tx.serialized.is_empty());
    }

    #[test]
    fn test_insufficient_funds_boundary() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 100);

        // amount 90 + fee 11 > 100 fails
        let err = build_transaction(&TransactionParams {
            notes: vec![note.clone()],
            outputs: vec![PaymentOutput::new(recipient, 90)],
            fee: 11,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientFunds);

        // amount 90 + fee 10 == 100 succeeds
        build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![PaymentOutput::new(recipient, 90)],
            fee: 10,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap();
    }

    #[test]
    fn test_note_total_overflow_rejected() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        // Two near-max notes sum past u64::MAX and must not wrap into a
        // small "available" total
        let notes = vec![test_note(public, u64::MAX), test_note(public, u64::MAX)];

        let err = build_transaction(&TransactionParams {
            notes,
            outputs: vec![PaymentOutput::new(recipient, 10)],
            fee: 1,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_output_total_overflow_rejected() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 100);

        let err = build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![
                PaymentOutput::new(recipient, u64::MAX),
                PaymentOutput::new(recipient, u64::MAX),
            ],
            fee: 1,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_validation_rejects_bad_keys() {
        let (_, public) = keypair(1);
        let note = test_note(public, 100);

        let err = build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![PaymentOutput::new(public, 10)],
            fee: 1,
            private_key: &[0u8; 16],
            public_key: public.as_bytes(),
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);
    }

    #[test]
    fn test_rejects_empty_notes_and_outputs() {
        let (private, public) = keypair(1);
        let note = test_note(public, 100);

        assert!(build_transaction(&TransactionParams {
            notes: vec![],
            outputs: vec![PaymentOutput::new(public, 10)],
            fee: 1,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .is_err());

        assert!(build_transaction(&TransactionParams {
            notes: vec![note],
            outputs: vec![],
            fee: 1,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .is_err());
    }

    #[test]
    fn test_multi_note_concentrates_outputs_on_first_spend() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let notes = vec![test_note(public, 60), test_note(public, 60)];

        let tx = build_transaction(&TransactionParams {
            notes,
            outputs: vec![PaymentOutput::new(recipient, 100)],
            fee: 10,
            private_key: private.as_bytes(),
            public_key: public.as_bytes(),
        })
        .unwrap();

        assert_eq!(tx.input_count, 2);
        // Each input carries the fee once
        assert_eq!(tx.total_fees, 20);
    }

    #[test]
    fn test_build_payment_with_change() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 100);

        let tx = build_payment(
            &note,
            &recipient,
            60,
            &public,
            10,
            private.as_bytes(),
            public.as_bytes(),
        )
        .unwrap();
        assert_eq!(tx.input_count, 1);
    }

    #[test]
    fn test_build_payment_insufficient() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 50);

        let err = build_payment(
            &note,
            &recipient,
            60,
            &public,
            10,
            private.as_bytes(),
            public.as_bytes(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientFunds);
    }

    #[test]
    fn test_conservation() {
        let (private, public) = keypair(1);
        let (_, recipient) = keypair(2);
        let note = test_note(public, 100);

        let tx = build_payment(
            &note,
            &recipient,
            60,
            &public,
            10,
            private.as_bytes(),
            public.as_bytes(),
        )
        .unwrap();

        let decoded: RawTx = bincode::deserialize(&tx.serialized).unwrap();
        let input_value: u64 = decoded.inputs().iter().map(|i| i.value()).sum();
        let output_value: u64 = decoded
            .inputs()
            .iter()
            .flat_map(|i| i.spend().seeds())
            .map(|s| s.amount)
            .sum();

        // sum(inputs) == sum(outputs) + fee, exactly
        assert_eq!(input_value, output_value + decoded.total_fees());
    }
}
