//! Argument and parameter types used by V.25ter control Commands
use atat::atat_derive::AtatEnum;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum Echo {
    /// 0: echo off
    Disable = 0,
    /// 1 (factory-programmed value): echo on
    Enable = 1,
}
