//! Delivery and billing address panes.

use storekeep_core::Address;

use crate::checkout::{CheckoutPane, PaneContext, PaneError, PaneField, PaneInput, PaneView, ReviewLine};
use crate::models::{AddressKind, Order};

/// Address fields in form order: name, label, required.
const FIELDS: [(&str, &str, bool); 11] = [
    ("first_name", "First name", true),
    ("last_name", "Last name", true),
    ("company", "Company", false),
    ("street1", "Street address", true),
    ("street2", "Street address 2", false),
    ("city", "City", true),
    ("zone", "State/Province", true),
    ("country", "Country", true),
    ("postal_code", "Postal code", true),
    ("phone", "Phone number", false),
    ("email", "E-mail", false),
];

/// Checkbox that copies the delivery address into the billing address.
pub const COPY_ADDRESS_FIELD: &str = "copy_address";

/// Collects one of the order's addresses.
#[derive(Debug, Clone, Copy)]
pub struct AddressPane {
    kind: AddressKind,
}

impl AddressPane {
    /// Where the order ships to. Only applies to shippable orders.
    #[must_use]
    pub const fn delivery() -> Self {
        Self {
            kind: AddressKind::Delivery,
        }
    }

    /// Who pays for the order.
    #[must_use]
    pub const fn billing() -> Self {
        Self {
            kind: AddressKind::Billing,
        }
    }

    fn field_value(address: &Address, field: &str) -> String {
        match field {
            "first_name" => address.first_name.clone(),
            "last_name" => address.last_name.clone(),
            "company" => address.company.clone(),
            "street1" => address.street1.clone(),
            "street2" => address.street2.clone(),
            "city" => address.city.clone(),
            "zone" if address.zone != 0 => address.zone.to_string(),
            "country" if address.country != 0 => address.country.to_string(),
            "postal_code" => address.postal_code.clone(),
            "phone" => address.phone.clone(),
            "email" => address.email.clone(),
            _ => String::new(),
        }
    }

    fn parse(&self, input: &PaneInput, ctx: &PaneContext<'_>) -> Result<Address, PaneError> {
        let pane = self.id();
        let country = match input.value("country") {
            Some(value) => value
                .parse::<u16>()
                .ok()
                .filter(|code| ctx.countries.country(*code).is_some())
                .ok_or_else(|| PaneError::field(pane, "country", "Select a valid country."))?,
            None => ctx.store_country,
        };
        let zones = ctx.countries.zones_for(country);
        let zone = match input.value("zone") {
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| PaneError::field(pane, "zone", "Select a valid State/Province."))?,
            None => 0,
        };

        for (field, label, required) in FIELDS {
            let zone_optional = field == "zone" && zones.is_empty();
            if required && !zone_optional && field != "country" && input.value(field).is_none() {
                return Err(PaneError::field(pane, field, format!("{label} field is required.")));
            }
        }
        if !ctx.countries.is_valid_zone(country, zone) {
            return Err(PaneError::field(pane, "zone", "Select a valid State/Province."));
        }

        let text = |field: &str| input.value(field).unwrap_or_default().to_string();
        Ok(Address {
            first_name: text("first_name"),
            last_name: text("last_name"),
            company: text("company"),
            street1: text("street1"),
            street2: text("street2"),
            city: text("city"),
            zone,
            country,
            postal_code: text("postal_code"),
            phone: text("phone"),
            email: text("email"),
        })
    }
}

impl CheckoutPane for AddressPane {
    fn id(&self) -> &str {
        match self.kind {
            AddressKind::Delivery => "delivery",
            AddressKind::Billing => "billing",
        }
    }

    fn title(&self) -> &str {
        match self.kind {
            AddressKind::Delivery => "Delivery information",
            AddressKind::Billing => "Billing information",
        }
    }

    fn weight(&self) -> i32 {
        match self.kind {
            AddressKind::Delivery => 3,
            AddressKind::Billing => 4,
        }
    }

    fn applies_to(&self, order: &Order) -> bool {
        self.kind == AddressKind::Billing || order.is_shippable()
    }

    fn view(&self, order: &Order, ctx: &PaneContext<'_>) -> PaneView {
        let address = order.address(self.kind);
        let mut notes = vec![match self.kind {
            AddressKind::Delivery => "Enter your delivery address and information here.",
            AddressKind::Billing => "Enter your billing address and information here.",
        }
        .to_string()];
        let mut fields: Vec<PaneField> = FIELDS
            .iter()
            .map(|(name, label, required)| {
                let field = PaneField::text(name, label, &Self::field_value(address, name));
                if *required { field.required() } else { field }
            })
            .collect();

        let country = if address.country == 0 { ctx.store_country } else { address.country };
        let zones: Vec<(String, String)> = ctx
            .countries
            .zones_for(country)
            .into_iter()
            .map(|zone| (zone.id.to_string(), zone.name.clone()))
            .collect();
        if let Some(field) = fields.iter_mut().find(|field| field.name == "zone") {
            field.required = !zones.is_empty();
            field.options = zones;
        }

        if self.kind == AddressKind::Billing && order.is_shippable() {
            notes.push("My billing information is the same as my delivery information.".to_string());
            fields.insert(0, PaneField::text(COPY_ADDRESS_FIELD, "Same as delivery", ""));
        }

        PaneView {
            pane: self.id().to_string(),
            title: self.title().to_string(),
            notes,
            fields,
            errors: Vec::new(),
        }
    }

    fn process(&self, order: &mut Order, input: &PaneInput, ctx: &PaneContext<'_>) -> Result<(), PaneError> {
        let address = if self.kind == AddressKind::Billing
            && order.is_shippable()
            && input.flag(COPY_ADDRESS_FIELD)
        {
            order.delivery().clone()
        } else {
            self.parse(input, ctx)?
        };
        order.set_address(self.kind, address);
        Ok(())
    }

    fn review(&self, order: &Order, ctx: &PaneContext<'_>) -> Option<Vec<ReviewLine>> {
        let address = order.address(self.kind);
        let mut lines = vec![ReviewLine::new("Address", ctx.formatter().format(address))];
        if !address.phone.trim().is_empty() {
            lines.push(ReviewLine::new("Phone", address.phone.trim()));
        }
        Some(lines)
    }
}
