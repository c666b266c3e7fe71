/**
 * Transactions Module: the payment-order-ticket engine
 *
 * Exports:
 * - state: transaction status state machine
 * - dto: domain types and operation outcomes
 * - repository: data access (transactions, orders, tickets, product rows)
 * - service: TransactionEngine (initiate / complete / fail / refund / retry)
 * - retry: backoff policy + background retry scheduler
 * - handler: HTTP endpoints
 */

pub mod dto;
pub mod handler;
pub mod repository;
pub mod retry;
pub mod service;
pub mod state;
