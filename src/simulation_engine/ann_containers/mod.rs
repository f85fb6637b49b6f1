mod local_rib;
mod recv_queue;
mod ribs_in;
mod ribs_out;
mod send_queue;
mod withdrawal_trie;

pub use local_rib::LocalRIB;
pub use recv_queue::RecvQueue;
pub use ribs_in::{AnnInfo, RIBsIn};
pub use ribs_out::RIBsOut;
pub use send_queue::{SendInfo, SendQueue};
pub use withdrawal_trie::WithdrawalTrie;
