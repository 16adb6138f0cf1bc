pub mod mdstat;
