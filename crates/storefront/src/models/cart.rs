//! Session-stored shopping cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Price, ProductId};

use super::product::{Product, product_href};

/// Largest quantity of a single product a cart line can hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// A cart line. Name, image and price are captured when the item is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn href(&self) -> String {
        product_href(&self.slug)
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }

    #[must_use]
    pub fn line_price(&self) -> Price {
        self.unit_price() * self.quantity
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// The resulting line quantity is clamped to the product's stock and to
    /// [`MAX_LINE_QUANTITY`]. Returns the quantity now in the cart, which is
    /// zero when the product is out of stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> u32 {
        let cap = product.count_in_stock.min(MAX_LINE_QUANTITY);
        if cap == 0 {
            return 0;
        }

        if let Some(line) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity).min(cap);
            line.price = product.price;
            return line.quantity;
        }

        let quantity = quantity.clamp(1, cap);
        self.items.push(CartItem {
            product_id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            image: product.primary_image().map(str::to_owned),
            price: product.price,
            quantity,
        });
        quantity
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .fold(Price::zero(), |acc, item| acc + item.line_price())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::memory::product_fixture;

    use super::*;

    fn product(id: i32, stock: u32) -> Product {
        Product {
            count_in_stock: stock,
            ..product_fixture(id)
        }
    }

    #[test]
    fn test_add_merges_lines_and_clamps_to_stock() {
        let mut cart = Cart::default();
        let shoe = product(1, 3);

        assert_eq!(cart.add(&shoe, 2), 2);
        assert_eq!(cart.add(&shoe, 5), 3);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_out_of_stock_is_noop() {
        let mut cart = Cart::default();
        assert_eq!(cart.add(&product(1, 0), 1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_remove() {
        let mut cart = Cart::default();
        cart.add(&product(1, 10), 2);
        cart.add(&product(2, 10), 1);
        assert_eq!(cart.subtotal().to_string(), "$30.00");

        assert!(cart.remove(ProductId::new(1)));
        assert!(!cart.remove(ProductId::new(1)));
        assert_eq!(cart.subtotal().to_string(), "$10.00");
    }
}
