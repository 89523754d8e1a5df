use ed25519_dalek::{Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use super::message::{MessageError, VersionedMessage};
use super::pubkey::{Signature, SIGNATURE_BYTES};
use super::shortvec::{decode_len, encode_len};

/// Errors placing signatures into slots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("message requires no signatures")]
    NoSigners,

    #[error("signer slot {slot} out of range for {required} required signatures")]
    OutOfRange { slot: usize, required: usize },
}

/// Position of a signer in the signature array.
///
/// The service's own signature goes into the configured slot, which is the
/// fee payer position (0) unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerSlot(pub usize);

impl SignerSlot {
    pub const FEE_PAYER: SignerSlot = SignerSlot(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl Default for SignerSlot {
    fn default() -> Self {
        SignerSlot::FEE_PAYER
    }
}

/// Ordered signature array, one slot per required signer.
///
/// Length always equals the message's `num_required_signatures`. Unfilled
/// slots hold the 64-byte zero placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSlots {
    slots: SmallVec<[Signature; 4]>,
}

impl SignatureSlots {
    /// Create a zero-filled array sized for `message`.
    pub fn for_message(message: &VersionedMessage) -> Result<Self, SlotError> {
        let required = message.required_signatures();
        if required == 0 {
            return Err(SlotError::NoSigners);
        }
        Ok(SignatureSlots {
            slots: SmallVec::from_elem(Signature::placeholder(), required),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: SignerSlot) -> Option<&Signature> {
        self.slots.get(slot.index())
    }

    /// Write `signature` into `slot`.
    pub fn place(&mut self, slot: SignerSlot, signature: Signature) -> Result<(), SlotError> {
        let required = self.slots.len();
        let entry = self.slots.get_mut(slot.index()).ok_or(SlotError::OutOfRange {
            slot: slot.index(),
            required,
        })?;
        *entry = signature;
        Ok(())
    }

    /// Find the slot whose signer key verifies `signature` over `message_bytes`.
    pub fn matching_slot(
        message: &VersionedMessage,
        message_bytes: &[u8],
        signature: &Signature,
    ) -> Option<SignerSlot> {
        let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());

        message
            .signer_keys()
            .iter()
            .position(|key| {
                VerifyingKey::from_bytes(key.as_bytes())
                    .map(|vk| vk.verify(message_bytes, &sig).is_ok())
                    .unwrap_or(false)
            })
            .map(SignerSlot)
    }

    /// First placeholder slot other than `skip`.
    pub fn first_unfilled_except(&self, skip: SignerSlot) -> Option<SignerSlot> {
        self.slots
            .iter()
            .enumerate()
            .find(|(i, sig)| *i != skip.index() && sig.is_placeholder())
            .map(|(i, _)| SignerSlot(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.slots.iter()
    }

    /// Number of slots holding a real signature.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_placeholder()).count()
    }

    /// Base58 text of every slot, placeholders included.
    pub fn to_text(&self) -> Vec<String> {
        self.slots.iter().map(ToString::to_string).collect()
    }
}

/// Signed transaction ready for the wire: signature array plus message bytes.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub signatures: SignatureSlots,
    pub message_bytes: Vec<u8>,
}

impl SignedTransaction {
    pub fn new(signatures: SignatureSlots, message_bytes: Vec<u8>) -> Self {
        SignedTransaction {
            signatures,
            message_bytes,
        }
    }

    /// Wire encoding: compact-u16 signature count, signatures, message.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(3 + self.signatures.len() * SIGNATURE_BYTES + self.message_bytes.len());
        // Slot count is bounded by a u8 header field.
        encode_len(&mut out, self.signatures.len() as u16);
        for sig in self.signatures.iter() {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.message_bytes);
        out
    }

    /// The transaction id is the first signature.
    pub fn id(&self) -> Option<&Signature> {
        self.signatures.get(SignerSlot::FEE_PAYER)
    }
}

/// Summary of a wire transaction's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireSummary {
    pub signature_count: usize,
    pub instruction_count: usize,
    pub message: VersionedMessage,
}

/// Decode a full wire transaction and check its signature count against the header.
pub fn inspect_wire_transaction(bytes: &[u8]) -> Result<WireSummary, MessageError> {
    let (count, mut pos) = decode_len(bytes)?;
    let count = usize::from(count);

    let sig_bytes = count * SIGNATURE_BYTES;
    if bytes.len() - pos < sig_bytes {
        return Err(MessageError::Truncated("signatures"));
    }
    pos += sig_bytes;

    let (message, consumed) = VersionedMessage::deserialize_prefix(&bytes[pos..])?;
    let trailing = bytes.len() - pos - consumed;
    if trailing > 0 {
        return Err(MessageError::TrailingBytes(trailing));
    }

    if count != message.required_signatures() {
        return Err(MessageError::InconsistentHeader {
            required: message.header.num_required_signatures,
            keys: count,
        });
    }

    Ok(WireSummary {
        signature_count: count,
        instruction_count: message.compiled_instructions.len(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::fixtures::message_with_signers;
    use crate::domain::message::MessageVersion;
    use crate::domain::Pubkey;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_slots_sized_to_header() {
        let msg = message_with_signers(
            &[Pubkey::new([1; 32]), Pubkey::new([2; 32]), Pubkey::new([3; 32])],
            MessageVersion::Legacy,
        );
        let slots = SignatureSlots::for_message(&msg).unwrap();

        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(Signature::is_placeholder));
        assert_eq!(slots.filled(), 0);
    }

    #[test]
    fn test_no_signers_rejected() {
        let mut msg = message_with_signers(&[Pubkey::new([1; 32])], MessageVersion::Legacy);
        msg.header.num_required_signatures = 0;

        assert_eq!(SignatureSlots::for_message(&msg), Err(SlotError::NoSigners));
    }

    #[test]
    fn test_place_out_of_range() {
        let msg = message_with_signers(&[Pubkey::new([1; 32])], MessageVersion::Legacy);
        let mut slots = SignatureSlots::for_message(&msg).unwrap();

        let err = slots
            .place(SignerSlot(1), Signature::new([1; 64]))
            .unwrap_err();
        assert_eq!(err, SlotError::OutOfRange { slot: 1, required: 1 });
    }

    #[test]
    fn test_matching_slot_by_verification() {
        let first = SigningKey::from_bytes(&[11u8; 32]);
        let second = SigningKey::from_bytes(&[22u8; 32]);
        let msg = message_with_signers(
            &[
                Pubkey::new(first.verifying_key().to_bytes()),
                Pubkey::new(second.verifying_key().to_bytes()),
            ],
            MessageVersion::V0,
        );
        let bytes = msg.serialize().unwrap();
        let sig = Signature::from(second.sign(&bytes));

        assert_eq!(
            SignatureSlots::matching_slot(&msg, &bytes, &sig),
            Some(SignerSlot(1))
        );
        assert_eq!(
            SignatureSlots::matching_slot(&msg, &bytes, &Signature::new([3; 64])),
            None
        );
    }

    #[test]
    fn test_first_unfilled_except() {
        let msg = message_with_signers(
            &[Pubkey::new([1; 32]), Pubkey::new([2; 32]), Pubkey::new([3; 32])],
            MessageVersion::Legacy,
        );
        let mut slots = SignatureSlots::for_message(&msg).unwrap();
        slots.place(SignerSlot(1), Signature::new([4; 64])).unwrap();

        assert_eq!(slots.first_unfilled_except(SignerSlot(0)), Some(SignerSlot(2)));
    }

    #[test]
    fn test_wire_layout_and_inspection() {
        let msg = message_with_signers(
            &[Pubkey::new([1; 32]), Pubkey::new([2; 32])],
            MessageVersion::Legacy,
        );
        let bytes = msg.serialize().unwrap();
        let mut slots = SignatureSlots::for_message(&msg).unwrap();
        slots.place(SignerSlot(0), Signature::new([6; 64])).unwrap();

        let tx = SignedTransaction::new(slots, bytes.clone());
        let wire = tx.to_wire();

        assert_eq!(wire[0], 2);
        assert_eq!(&wire[1..65], &[6u8; 64][..]);
        assert_eq!(&wire[65..129], &[0u8; 64][..]);
        assert_eq!(&wire[129..], bytes.as_slice());
        assert_eq!(tx.id(), Some(&Signature::new([6; 64])));

        let summary = inspect_wire_transaction(&wire).unwrap();
        assert_eq!(summary.signature_count, 2);
        assert_eq!(summary.instruction_count, 1);
    }

    #[test]
    fn test_inspection_rejects_count_mismatch() {
        let msg = message_with_signers(&[Pubkey::new([1; 32])], MessageVersion::Legacy);
        let mut wire = vec![2u8];
        wire.extend_from_slice(&[0u8; 128]);
        wire.extend_from_slice(&msg.serialize().unwrap());

        assert!(matches!(
            inspect_wire_transaction(&wire),
            Err(MessageError::InconsistentHeader { .. })
        ));
    }
}
