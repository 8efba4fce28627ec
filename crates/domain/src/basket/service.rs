//! Basket service providing the command handlers for basket operations.

use common::BasketId;
use event_store::EventStore;

use crate::command::{Command, CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    AddItems, AdjustItemQuantity, Basket, BasketError, CreateBasket, SetDiscountCode,
    SetShippingCost,
};

/// Service for managing baskets.
///
/// Every method is a stateless command handler: it loads the basket's full
/// stream, applies one command and appends the resulting events with the
/// loaded event count as the concurrency token. Conflicts are returned to the
/// caller, never retried.
pub struct BasketService<S: EventStore> {
    handler: CommandHandler<S, Basket>,
}

impl<S: EventStore> BasketService<S> {
    /// Creates a new basket service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Basket> {
        &self.handler
    }

    /// Creates an empty basket.
    #[tracing::instrument(skip(self))]
    pub async fn create_basket(
        &self,
        cmd: CreateBasket,
    ) -> Result<CommandResult<Basket>, DomainError> {
        let basket_id = cmd.basket_id.clone();

        let result = self
            .handler
            .execute(&cmd.stream_id(), |basket, count| {
                basket.create(basket_id, count.next())
            })
            .await?;

        record_command(&cmd);
        Ok(result)
    }

    /// Adds items to a basket, creating the basket first if it has no events.
    #[tracing::instrument(skip(self))]
    pub async fn add_items(&self, cmd: AddItems) -> Result<CommandResult<Basket>, DomainError> {
        if cmd.items.is_empty() {
            return Err(BasketError::NoItems.into());
        }

        let basket_id = cmd.basket_id.clone();
        let items = cmd.items.clone();

        let result = self
            .handler
            .execute(&cmd.stream_id(), |basket, count| {
                let mut sequence_number = count.next();

                if !basket.is_created() {
                    basket.create(basket_id, sequence_number)?;
                    sequence_number = sequence_number.next();
                }

                for item in items {
                    basket.add_item(item.product_id, item.quantity, sequence_number)?;
                    sequence_number = sequence_number.next();
                }

                Ok(())
            })
            .await?;

        record_command(&cmd);
        Ok(result)
    }

    /// Changes the quantity of a line, removing it if the result is zero or less.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_item_quantity(
        &self,
        cmd: AdjustItemQuantity,
    ) -> Result<CommandResult<Basket>, DomainError> {
        let product_id = cmd.product_id.clone();
        let quantity_delta = cmd.quantity_delta;

        let result = self
            .handler
            .execute(&cmd.stream_id(), |basket, count| {
                basket.adjust_item_quantity(product_id, quantity_delta, count.next())
            })
            .await?;

        record_command(&cmd);
        Ok(result)
    }

    /// Applies a discount code, replacing any previous one.
    #[tracing::instrument(skip(self))]
    pub async fn set_discount_code(
        &self,
        cmd: SetDiscountCode,
    ) -> Result<CommandResult<Basket>, DomainError> {
        let code = cmd.code.clone();

        let result = self
            .handler
            .execute(&cmd.stream_id(), |basket, count| {
                basket.set_discount_code(code, count.next())
            })
            .await?;

        record_command(&cmd);
        Ok(result)
    }

    /// Sets the shipping cost for a destination country.
    #[tracing::instrument(skip(self))]
    pub async fn set_shipping_cost(
        &self,
        cmd: SetShippingCost,
    ) -> Result<CommandResult<Basket>, DomainError> {
        let country_code = cmd.country_code.clone();
        let cost = cmd.cost;

        let result = self
            .handler
            .execute(&cmd.stream_id(), |basket, count| {
                basket.set_shipping_cost(country_code, cost, count.next())
            })
            .await?;

        record_command(&cmd);
        Ok(result)
    }

    /// Loads a basket by ID.
    ///
    /// Returns None if the basket doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_basket(&self, basket_id: &BasketId) -> Result<Option<Basket>, DomainError> {
        self.handler.load_existing(&basket_id.stream_id()).await
    }
}

fn record_command<C: Command>(cmd: &C) {
    metrics::counter!("basket_commands_total", "command" => cmd.name()).increment(1);
    tracing::debug!(command = cmd.name(), stream_id = %cmd.stream_id(), "command applied");
}
