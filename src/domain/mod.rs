pub mod cluster;
pub mod evidence;
pub mod message;
pub mod pubkey;
pub mod result;
pub mod rule;
pub mod shortvec;
pub mod transaction;

pub use cluster::{Commitment, Network};
pub use evidence::{Flag, UserEvidence};
pub use message::{MessageError, MessageHeader, MessageVersion, VersionedMessage};
pub use pubkey::{Pubkey, Signature};
pub use result::{Confirmation, FormatReport, MessageInfo, TransactionResult};
pub use rule::{Marketplace, Rule, RuleKind, RuleValue};
pub use transaction::{SignatureSlots, SignedTransaction, SignerSlot, SlotError};
