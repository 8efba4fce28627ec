//! Domain layer for the basket service.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait for event-sourced entities
//! - DomainEvent trait for domain events
//! - Command trait and CommandHandler for command processing
//! - Basket aggregate with its command service

pub mod aggregate;
pub mod basket;
pub mod command;
pub mod error;

pub use aggregate::{Aggregate, DomainEvent};
pub use basket::{
    AddItems, AdjustItemQuantity, Basket, BasketError, BasketEvent, BasketEventData, BasketLine,
    BasketService, CreateBasket, ItemToAdd, SetDiscountCode, SetShippingCost,
};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
