use std::cell::RefCell;
use std::rc::Rc;

use fixtory_lib::{Factory, FactoryError, Overrides, Result};
use serde_json::json;

use super::common::*;

#[test]
fn makes_from_base_definition() -> Result<()> {
  let account = AccountFactory::new()?.make()?;

  assert_eq!(account.id, 1);
  assert_eq!(account.name, "John Doe");
  Ok(())
}

#[test]
fn overrides_via_make() -> Result<()> {
  let account = AccountFactory::new()?.make_with(json!({"id": 2, "name": "John Smith"}))?;

  assert_eq!(account, Account {
    id: 2,
    name: "John Smith".to_string()
  });
  Ok(())
}

#[test]
fn overrides_via_state() -> Result<()> {
  let account = AccountFactory::new()?
    .state(json!({"id": 2, "name": "John Smith"}))
    .make()?;

  assert_eq!(account.id, 2);
  assert_eq!(account.name, "John Smith");
  Ok(())
}

#[test]
fn uses_named_state() -> Result<()> {
  let account = AccountFactory::new()?.john_smith().make()?;

  assert_eq!(account.id, 2);
  assert_eq!(account.name, "John Smith");
  Ok(())
}

#[test]
fn make_overrides_named_state() -> Result<()> {
  let account = AccountFactory::new()?.john_smith().make_with(json!({"id": 3}))?;

  assert_eq!(account.id, 3);
  assert_eq!(account.name, "John Smith");
  Ok(())
}

#[test]
fn later_state_wins() -> Result<()> {
  let account = AccountFactory::new()?
    .state(json!({"id": 1}))
    .state(json!({"id": 2}))
    .make()?;

  assert_eq!(account.id, 2);
  Ok(())
}

#[test]
fn evaluates_lazy_states() -> Result<()> {
  let account = AccountFactory::new()?.make_with(Overrides::new().lazy("id", |_| Ok(4)))?;

  assert_eq!(account.id, 4);
  assert_eq!(account.name, "John Doe");
  Ok(())
}

#[test]
fn passes_current_attributes_to_lazy_states() -> Result<()> {
  let account = AccountFactory::new()?
    .state(Overrides::new().lazy("id", |attrs| {
      assert_eq!(attrs.to_json(), Some(json!({"id": 1, "name": "John Doe"})));
      Ok(2)
    }))
    .make_with(Overrides::new().lazy("id", |attrs| {
      assert_eq!(attrs.to_json(), Some(json!({"id": 2, "name": "John Doe"})));
      Ok(3)
    }))?;

  assert_eq!(account.id, 3);
  Ok(())
}

#[test]
fn lazy_states_compose() -> Result<()> {
  let bump = || Overrides::new().lazy("id", |attrs| Ok(attrs.get::<i64>("id")? + 1));
  let account = AccountFactory::new()?.state(bump()).state(bump()).make()?;

  assert_eq!(account.id, 3);
  Ok(())
}

#[test]
fn state_then_inline_override() -> Result<()> {
  let account = AccountFactory::new()?
    .state(json!({"id": 2, "name": "John Smith"}))
    .make_with(json!({"id": 3}))?;

  assert_eq!(account, Account {
    id: 3,
    name: "John Smith".to_string()
  });
  Ok(())
}

#[test]
fn inline_overrides_accumulate_across_makes() -> Result<()> {
  let mut builder = AccountFactory::new()?;
  let first = builder.make_with(json!({"name": "John Smith"}))?;
  let second = builder.make_with(json!({"id": 5}))?;

  assert_eq!(first.id, 1);
  assert_eq!(second.id, 5);
  assert_eq!(second.name, "John Smith");
  Ok(())
}

#[test]
fn modifies_object_after_making() -> Result<()> {
  let account = AccountFactory::new()?
    .after(|account| {
      account.name = "Modified John".to_string();
      Ok(())
    })
    .make()?;

  assert_eq!(account.name, "Modified John");
  Ok(())
}

#[test]
fn callbacks_run_in_registration_order() -> Result<()> {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let first = seen.clone();
  let second = seen.clone();

  let account = AccountFactory::new()?
    .after(move |account| {
      first.borrow_mut().push(account.name.clone());
      account.name.push_str(" Jr.");
      Ok(())
    })
    .after(move |account| {
      second.borrow_mut().push(account.name.clone());
      account.id *= 10;
      Ok(())
    })
    .make()?;

  assert_eq!(*seen.borrow(), vec!["John Doe", "John Doe Jr."]);
  assert_eq!(account.id, 10);
  Ok(())
}

#[test]
fn lazy_defaults_in_definition() -> Result<()> {
  let item = DerivedPriceItemFactory::new()?.make()?;

  assert_eq!(item.price, item.id * 10);
  assert_eq!(item.price, 200);
  Ok(())
}

#[test]
fn lazy_defaults_resolve_after_overrides() -> Result<()> {
  let item = DerivedPriceItemFactory::new()?.make_with(json!({"id": 5}))?;

  assert_eq!(item.price, 50);
  Ok(())
}

#[test]
fn object_values_pass_through() -> Result<()> {
  let payment = PaymentFactory::new()?.make()?;

  assert_eq!(payment.transaction_id, "123");
  assert_eq!(payment.handler.provider, "card");
  Ok(())
}

#[test]
fn unwraps_deferred_values() -> Result<()> {
  let named = NamedActionFactory::new()?.make()?;

  assert_eq!(named.name, "calculate-price");
  assert_eq!((named.action)(), 30);
  Ok(())
}

#[test]
fn ignores_undeclared_attributes() -> Result<()> {
  let account = AccountFactory::new()?
    .state(json!({"email": "john@example.com", "nickname": "JD"}))
    .make_with(Overrides::new().lazy("score", |attrs| Ok(attrs.get::<i64>("id")? * 2)))?;

  assert_eq!(account, Account {
    id: 1,
    name: "John Doe".to_string()
  });
  Ok(())
}

#[test]
fn missing_required_attribute_fails_make() -> Result<()> {
  let err = NamelessAccountFactory::new()?.make().unwrap_err();

  assert!(matches!(
    err,
    FactoryError::MissingRequiredAttribute { ref attribute, target } if attribute == "name" && target.ends_with("Account")
  ));
  Ok(())
}

#[test]
fn override_does_not_declare_new_required_attribute() -> Result<()> {
  // `name` only exists in an override, never in the definition
  let err = NamelessAccountFactory::new()?
    .make_with(json!({"name": "John Smith"}))
    .unwrap_err();

  assert!(matches!(err, FactoryError::MissingRequiredAttribute { .. }));
  Ok(())
}

#[test]
fn wrong_value_type_is_reported() -> Result<()> {
  let err = AccountFactory::new()?.make_with(json!({"id": "one"})).unwrap_err();

  assert_eq!(err.to_string(), "attribute 'id' expected i64, found string");
  Ok(())
}

#[test]
fn caller_errors_reach_make_unchanged() -> Result<()> {
  let err = AccountFactory::new()?
    .make_with(Overrides::new().lazy("id", |_| -> anyhow::Result<i64> {
      anyhow::bail!("id sequence exhausted")
    }))
    .unwrap_err();

  let FactoryError::Caller(inner) = err else {
    panic!("expected caller error");
  };
  assert_eq!(inner.to_string(), "id sequence exhausted");
  Ok(())
}

#[test]
fn make_many_builds_independent_objects() -> Result<()> {
  let accounts = AccountFactory::new()?
    .john_smith()
    .after(|account| {
      account.name.push('!');
      Ok(())
    })
    .make_many(3)?;

  assert_eq!(accounts.len(), 3);
  assert!(accounts.iter().all(|a| a.name == "John Smith!"));
  Ok(())
}
