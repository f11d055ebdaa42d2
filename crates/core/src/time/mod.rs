pub mod br_local;
