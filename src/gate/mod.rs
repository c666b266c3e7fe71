/**
 * Gate Module: ticket validation at venue entrances
 *
 * Exports:
 * - handler: scan + stats endpoints
 * - service: token verification and single-use check-in
 */

pub mod handler;
pub mod service;
