//! Data structures, the claim tree and the solver interface shared by the op-challenger agent.

pub mod fault;
