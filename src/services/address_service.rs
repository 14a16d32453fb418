use std::sync::Arc;

use sea_orm::DbErr;
use thiserror::Error;

use crate::{
    db::is_foreign_key_violation,
    models::Address,
    repository::{AddressInput, AddressRepository},
};

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("region_id must be a valid region")]
    InvalidRegion,
    #[error("street and house are required")]
    MissingFields,
    #[error("address not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] DbErr),
}

#[derive(Clone)]
pub struct AddressService {
    addresses: Arc<dyn AddressRepository>,
}

impl AddressService {
    pub fn new(addresses: Arc<dyn AddressRepository>) -> Self {
        Self { addresses }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Address>, AddressError> {
        Ok(self.addresses.list_by_user(user_id).await?)
    }

    pub async fn create(&self, user_id: i64, input: AddressInput) -> Result<Address, AddressError> {
        let input = validate(input)?;
        self.addresses
            .create(user_id, input)
            .await
            .map_err(unknown_region)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: AddressInput,
    ) -> Result<Address, AddressError> {
        let input = validate(input)?;
        match self
            .addresses
            .update(id, user_id, input)
            .await
            .map_err(unknown_region)?
        {
            Some(a) => Ok(a),
            None => Err(AddressError::NotFound),
        }
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), AddressError> {
        if !self.addresses.delete(id, user_id).await? {
            return Err(AddressError::NotFound);
        }
        Ok(())
    }
}

fn unknown_region(err: DbErr) -> AddressError {
    if is_foreign_key_violation(&err) {
        AddressError::InvalidRegion
    } else {
        AddressError::Storage(err)
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(input: AddressInput) -> Result<AddressInput, AddressError> {
    if input.region_id <= 0 {
        return Err(AddressError::InvalidRegion);
    }
    let street = input.street.trim().to_string();
    let house = input.house.trim().to_string();
    if street.is_empty() || house.is_empty() {
        return Err(AddressError::MissingFields);
    }
    Ok(AddressInput {
        region_id: input.region_id,
        street,
        house,
        entrance: trim_optional(input.entrance),
        flat: trim_optional(input.flat),
        comment: trim_optional(input.comment),
        is_default: input.is_default,
    })
}
