use std::cell::Cell;
use std::rc::Rc;

use fixtory_lib::{Arguments, Attr, Factory, Overrides, Result};
use serde_json::json;

use super::common::*;

#[test]
fn makes_nested_builders_as_properties() -> Result<()> {
  let customer = CustomerFactory::new()?.make()?;

  assert_eq!(customer.primary_account, AccountFactory::new()?.make()?);
  Ok(())
}

#[test]
fn makes_nested_builders_inside_lists() -> Result<()> {
  let customer = CustomerFactory::new()?.make()?;

  assert_eq!(customer.linked_accounts.len(), 2);
  assert_eq!(customer.linked_accounts[0].id, 1);
  assert_eq!(customer.linked_accounts[1].id, 2);
  Ok(())
}

#[test]
fn makes_nested_builders_inside_maps() -> Result<()> {
  let customer = CustomerFactory::new()?.make()?;

  let owner = &customer.accounts_by_role["owner"];
  assert_eq!(owner, &AccountFactory::new()?.john_smith().make()?);
  assert_eq!(customer.accounts_by_role["viewer"].name, "Jane Roe");
  Ok(())
}

#[test]
fn keeps_collections_of_made_objects() -> Result<()> {
  let order = OrderFactory::new()?.make()?;

  assert_eq!(order.items.first(), Some(&Item { id: 1, price: 100_50 }));
  assert_eq!(order.items.last(), Some(&Item { id: 2, price: 200_25 }));
  Ok(())
}

#[test]
fn nested_builder_can_be_overridden_by_a_literal_object() -> Result<()> {
  let replacement = Account {
    id: 99,
    name: "Override".to_string(),
  };
  let customer = CustomerFactory::new()?
    .state(Overrides::new().with("primary_account", Attr::object(replacement.clone())))
    .make()?;

  assert_eq!(customer.primary_account, replacement);
  Ok(())
}

#[test]
fn nested_builder_can_be_swapped_for_another_builder() -> Result<()> {
  let customer = CustomerFactory::new()?
    .state(Overrides::new().with("primary_account", AccountFactory::new()?.john_smith()))
    .make()?;

  assert_eq!(customer.primary_account.name, "John Smith");
  Ok(())
}

/// Counts how many times its builders were made.
struct CountingFactory {
  made: Rc<Cell<usize>>,
}

impl Factory for CountingFactory {
  type Target = Account;

  fn definition(&self) -> Result<Overrides> {
    let made = self.made.clone();
    Ok(Overrides::new().with("id", 1).lazy("name", move |_| {
      made.set(made.get() + 1);
      Ok("Counted")
    }))
  }

  fn construct(&self, args: Arguments) -> Result<Account> {
    AccountFactory.construct(args)
  }
}

#[test]
fn nested_builders_are_made_once_per_parent_make() -> Result<()> {
  let made = Rc::new(Cell::new(0));
  let nested = fixtory_lib::Builder::from_factory(CountingFactory { made: made.clone() })?;
  let customer = CustomerFactory::new()?.state(Overrides::new().with("primary_account", nested));
  assert_eq!(made.get(), 0);

  customer.make()?;
  customer.make()?;
  assert_eq!(made.get(), 2);
  Ok(())
}

#[test]
fn nested_builders_under_undeclared_keys_still_run() -> Result<()> {
  let made = Rc::new(Cell::new(0));
  let nested = fixtory_lib::Builder::from_factory(CountingFactory { made: made.clone() })?;

  let account = AccountFactory::new()?
    .state(Overrides::new().with("backup_account", nested))
    .make_with(json!({"id": 4}))?;

  assert_eq!(account.id, 4);
  assert_eq!(made.get(), 1);
  Ok(())
}
