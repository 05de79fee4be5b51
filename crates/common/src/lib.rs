pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn notice_serializes_as_error_field() {
        let n = types::Notice::error("Listing you requested for does not exist!");
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["error"], "Listing you requested for does not exist!");
        assert!(v.get("success").is_none());
    }
}
