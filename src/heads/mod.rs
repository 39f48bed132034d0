mod q_head;

pub use q_head::{QHead, QHeadConfig};
