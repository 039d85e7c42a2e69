//! Static catalog of partner API resources.
//!
//! # Design
//! Each resource action is an `Endpoint`: a verb, a path template with
//! `{name}` placeholders and the default query merged under the caller's.
//! `InstinctClient::invoke` is the only code path that interprets them; the
//! typed helpers at the bottom of this file only shape arguments.
//!
//! Required path parameters are checked before any network traffic. A
//! missing or blank value yields `ApiResult::precondition_failed`, not `None`.

use serde_json::Value;
use tracing::warn;

use crate::client::InstinctClient;
use crate::http::{HttpMethod, Transport};
use crate::query::{merge_query, Query};
use crate::types::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub default_query: &'static [(&'static str, &'static str)],
}

const PAGED: &[(&str, &str)] = &[("limit", "100")];
const UNPAGED: &[(&str, &str)] = &[];

macro_rules! endpoints {
    ($($ident:ident => $name:literal, $method:ident, $path:literal, $query:expr;)*) => {
        $(
            pub const $ident: Endpoint = Endpoint {
                name: $name,
                method: HttpMethod::$method,
                path: $path,
                default_query: $query,
            };
        )*

        /// Every known endpoint, in declaration order.
        pub const CATALOG: &[Endpoint] = &[$($ident),*];
    };
}

endpoints! {
    LIST_ACCOUNTS => "list_accounts", Get, "/accounts", PAGED;
    GET_ACCOUNT => "get_account", Get, "/accounts/{account_id}", UNPAGED;
    CREATE_ACCOUNT => "create_account", Post, "/accounts", UNPAGED;
    UPDATE_ACCOUNT => "update_account", Patch, "/accounts/{account_id}", UNPAGED;
    LIST_ACCOUNT_PATIENTS => "list_account_patients", Get, "/accounts/{account_id}/patients", PAGED;
    LIST_ACCOUNT_INVOICES => "list_account_invoices", Get, "/accounts/{account_id}/invoices", PAGED;

    LIST_PATIENTS => "list_patients", Get, "/patients", PAGED;
    GET_PATIENT => "get_patient", Get, "/patients/{patient_id}", UNPAGED;
    CREATE_PATIENT => "create_patient", Post, "/patients", UNPAGED;
    UPDATE_PATIENT => "update_patient", Patch, "/patients/{patient_id}", UNPAGED;
    LIST_PATIENT_VISITS => "list_patient_visits", Get, "/patients/{patient_id}/visits", PAGED;
    LIST_PATIENT_VACCINATIONS => "list_patient_vaccinations", Get, "/patients/{patient_id}/vaccinations", PAGED;
    LIST_PATIENT_VITALS => "list_patient_vitals", Get, "/patients/{patient_id}/vitals", PAGED;
    LIST_PATIENT_ALERTS => "list_patient_alerts", Get, "/patients/{patient_id}/alerts", PAGED;

    LIST_VISITS => "list_visits", Get, "/visits", PAGED;
    GET_VISIT => "get_visit", Get, "/visits/{visit_id}", UNPAGED;
    CREATE_VISIT => "create_visit", Post, "/visits", UNPAGED;
    UPDATE_VISIT => "update_visit", Patch, "/visits/{visit_id}", UNPAGED;
    LIST_VISIT_TREATMENTS => "list_visit_treatments", Get, "/visits/{visit_id}/treatments", PAGED;
    LIST_VISIT_NOTES => "list_visit_notes", Get, "/visits/{visit_id}/notes", PAGED;

    LIST_APPOINTMENTS => "list_appointments", Get, "/appointments", PAGED;
    GET_APPOINTMENT => "get_appointment", Get, "/appointments/{appointment_id}", UNPAGED;
    CREATE_APPOINTMENT => "create_appointment", Post, "/appointments", UNPAGED;
    UPDATE_APPOINTMENT => "update_appointment", Put, "/appointments/{appointment_id}", UNPAGED;
    CANCEL_APPOINTMENT => "cancel_appointment", Delete, "/appointments/{appointment_id}", UNPAGED;
    LIST_APPOINTMENT_TYPES => "list_appointment_types", Get, "/appointment-types", PAGED;

    LIST_INVOICES => "list_invoices", Get, "/invoices", PAGED;
    GET_INVOICE => "get_invoice", Get, "/invoices/{invoice_id}", UNPAGED;
    LIST_INVOICE_ITEMS => "list_invoice_items", Get, "/invoices/{invoice_id}/items", PAGED;
    LIST_PAYMENTS => "list_payments", Get, "/payments", PAGED;
    GET_PAYMENT => "get_payment", Get, "/payments/{payment_id}", UNPAGED;

    LIST_PRODUCTS => "list_products", Get, "/products", PAGED;
    GET_PRODUCT => "get_product", Get, "/products/{product_id}", UNPAGED;
    LIST_INVENTORY => "list_inventory", Get, "/inventory", PAGED;

    LIST_LOCATIONS => "list_locations", Get, "/locations", PAGED;
    GET_LOCATION => "get_location", Get, "/locations/{location_id}", UNPAGED;
    LIST_USERS => "list_users", Get, "/users", PAGED;
    GET_USER => "get_user", Get, "/users/{user_id}", UNPAGED;
    LIST_SPECIES => "list_species", Get, "/species", PAGED;
    LIST_BREEDS => "list_breeds", Get, "/species/{species_id}/breeds", PAGED;

    LIST_REMINDERS => "list_reminders", Get, "/reminders", PAGED;
    LIST_DOCUMENTS => "list_documents", Get, "/patients/{patient_id}/documents", PAGED;
    GET_DOCUMENT => "get_document", Get, "/patients/{patient_id}/documents/{document_id}", UNPAGED;
}

/// Look up a catalog entry by name.
pub fn endpoint(name: &str) -> Option<&'static Endpoint> {
    CATALOG.iter().find(|e| e.name == name)
}

impl Endpoint {
    pub fn default_query(&self) -> Query {
        self.default_query.iter().copied().collect()
    }

    /// Names of the `{placeholders}` in the path template, in order.
    pub fn path_params(&self) -> Vec<&'static str> {
        let mut params = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            params.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        params
    }

    /// Substitute `params` into the path template verbatim.
    ///
    /// Fails with a human-readable message when a placeholder has no value or
    /// only whitespace.
    pub fn render_path(&self, params: &[(&str, &str)]) -> Result<String, String> {
        // Single pass: substituted values are never rescanned.
        let mut path = String::with_capacity(self.path.len());
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            let value = params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{name} is required"))?;
            path.push_str(&rest[..start]);
            path.push_str(value);
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }
}

impl<T: Transport> InstinctClient<T> {
    /// Run a catalog endpoint.
    ///
    /// `query` is laid over the endpoint's defaults; `body` is only sent for
    /// methods that carry one.
    pub fn invoke(
        &self,
        endpoint: &Endpoint,
        path_params: &[(&str, &str)],
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Option<ApiResult> {
        let path = match endpoint.render_path(path_params) {
            Ok(path) => path,
            Err(message) => {
                warn!(endpoint = endpoint.name, %message, "rejected before sending");
                return Some(ApiResult::precondition_failed(message));
            }
        };
        let query = merge_query(&endpoint.default_query(), query);
        self.dispatch(endpoint.method, &path, Some(&query), body)
    }

    /// `invoke` by catalog name. An unknown name is a precondition failure.
    pub fn call(
        &self,
        name: &str,
        path_params: &[(&str, &str)],
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Option<ApiResult> {
        match endpoint(name) {
            Some(endpoint) => self.invoke(endpoint, path_params, query, body),
            None => Some(ApiResult::precondition_failed(format!(
                "unknown endpoint: {name}"
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    pub fn list_accounts(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_ACCOUNTS, &[], query, None)
    }

    pub fn get_account(&self, account_id: &str) -> Option<ApiResult> {
        self.invoke(&GET_ACCOUNT, &[("account_id", account_id)], None, None)
    }

    pub fn create_account(&self, account: &Value) -> Option<ApiResult> {
        self.invoke(&CREATE_ACCOUNT, &[], None, Some(account))
    }

    pub fn update_account(&self, account_id: &str, changes: &Value) -> Option<ApiResult> {
        self.invoke(&UPDATE_ACCOUNT, &[("account_id", account_id)], None, Some(changes))
    }

    pub fn list_account_patients(&self, account_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_ACCOUNT_PATIENTS, &[("account_id", account_id)], query, None)
    }

    pub fn list_account_invoices(&self, account_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_ACCOUNT_INVOICES, &[("account_id", account_id)], query, None)
    }

    // -------------------------------------------------------------------------
    // Patients
    // -------------------------------------------------------------------------

    pub fn list_patients(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PATIENTS, &[], query, None)
    }

    pub fn get_patient(&self, patient_id: &str) -> Option<ApiResult> {
        self.invoke(&GET_PATIENT, &[("patient_id", patient_id)], None, None)
    }

    pub fn create_patient(&self, patient: &Value) -> Option<ApiResult> {
        self.invoke(&CREATE_PATIENT, &[], None, Some(patient))
    }

    pub fn update_patient(&self, patient_id: &str, changes: &Value) -> Option<ApiResult> {
        self.invoke(&UPDATE_PATIENT, &[("patient_id", patient_id)], None, Some(changes))
    }

    pub fn list_patient_visits(&self, patient_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PATIENT_VISITS, &[("patient_id", patient_id)], query, None)
    }

    pub fn list_patient_vaccinations(&self, patient_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PATIENT_VACCINATIONS, &[("patient_id", patient_id)], query, None)
    }

    pub fn list_patient_vitals(&self, patient_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PATIENT_VITALS, &[("patient_id", patient_id)], query, None)
    }

    // -------------------------------------------------------------------------
    // Visits
    // -------------------------------------------------------------------------

    pub fn list_visits(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_VISITS, &[], query, None)
    }

    pub fn get_visit(&self, visit_id: &str) -> Option<ApiResult> {
        self.invoke(&GET_VISIT, &[("visit_id", visit_id)], None, None)
    }

    pub fn list_visit_treatments(&self, visit_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_VISIT_TREATMENTS, &[("visit_id", visit_id)], query, None)
    }

    // -------------------------------------------------------------------------
    // Appointments
    // -------------------------------------------------------------------------

    pub fn list_appointments(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_APPOINTMENTS, &[], query, None)
    }

    pub fn get_appointment(&self, appointment_id: &str) -> Option<ApiResult> {
        self.invoke(&GET_APPOINTMENT, &[("appointment_id", appointment_id)], None, None)
    }

    pub fn create_appointment(&self, appointment: &Value) -> Option<ApiResult> {
        self.invoke(&CREATE_APPOINTMENT, &[], None, Some(appointment))
    }

    pub fn update_appointment(&self, appointment_id: &str, appointment: &Value) -> Option<ApiResult> {
        self.invoke(
            &UPDATE_APPOINTMENT,
            &[("appointment_id", appointment_id)],
            None,
            Some(appointment),
        )
    }

    pub fn cancel_appointment(&self, appointment_id: &str) -> Option<ApiResult> {
        self.invoke(&CANCEL_APPOINTMENT, &[("appointment_id", appointment_id)], None, None)
    }

    // -------------------------------------------------------------------------
    // Billing
    // -------------------------------------------------------------------------

    pub fn list_invoices(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_INVOICES, &[], query, None)
    }

    pub fn get_invoice(&self, invoice_id: &str) -> Option<ApiResult> {
        self.invoke(&GET_INVOICE, &[("invoice_id", invoice_id)], None, None)
    }

    pub fn list_payments(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PAYMENTS, &[], query, None)
    }

    // -------------------------------------------------------------------------
    // Practice
    // -------------------------------------------------------------------------

    pub fn list_locations(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_LOCATIONS, &[], query, None)
    }

    pub fn list_users(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_USERS, &[], query, None)
    }

    pub fn list_products(&self, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_PRODUCTS, &[], query, None)
    }

    pub fn list_breeds(&self, species_id: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.invoke(&LIST_BREEDS, &[("species_id", species_id)], query, None)
    }

    pub fn get_document(&self, patient_id: &str, document_id: &str) -> Option<ApiResult> {
        self.invoke(
            &GET_DOCUMENT,
            &[("patient_id", patient_id), ("document_id", document_id)],
            None,
            None,
        )
    }
}
