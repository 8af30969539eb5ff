//! Known marketplace listing endpoints

use crate::core::normalize::ShapingOptions;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Listing endpoints with a known shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Buyer orders, one row per product item
    Orders,
    /// Buyer refunds
    Refunds,
    /// Product catalogue
    Products,
    /// Logistics details, queried per order ID
    Logistics,
}

impl Endpoint {
    /// Gateway API name
    pub fn api_name(self) -> &'static str {
        match self {
            Endpoint::Orders => "com.alibaba.trade/alibaba.trade.getBuyerOrderList",
            Endpoint::Refunds => "com.alibaba.trade/alibaba.trade.refund.buyer.queryOrderRefundList",
            Endpoint::Products => "com.alibaba.product/alibaba.product.list.get",
            Endpoint::Logistics => {
                "com.alibaba.logistics/alibaba.trade.ec.getLogisticsInfos.sellerView"
            }
        }
    }

    /// Parameters bounding the listing to a date range
    pub fn range_params(self) -> Option<(&'static str, &'static str)> {
        match self {
            Endpoint::Orders => Some(("createStartTime", "createEndTime")),
            Endpoint::Refunds => Some(("applyStartTime", "applyEndTime")),
            Endpoint::Products | Endpoint::Logistics => None,
        }
    }

    /// Extra parameters every call carries
    pub fn fixed_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Endpoint::Logistics => &[("website", "1688")],
            _ => &[],
        }
    }

    /// Parameter carrying the identifier in ID mode
    pub fn id_param(self) -> &'static str {
        "orderId"
    }

    /// Column that identifies a row, used to replace re-fetched rows
    pub fn id_column(self) -> Option<&'static str> {
        match self {
            Endpoint::Products => Some("productID"),
            Endpoint::Logistics => Some("logisticsId"),
            Endpoint::Orders | Endpoint::Refunds => None,
        }
    }

    /// Default destination table
    pub fn default_table(self) -> &'static str {
        match self {
            Endpoint::Orders => "1688_orders",
            Endpoint::Refunds => "1688_refunded_orders",
            Endpoint::Products => "1688_product_list",
            Endpoint::Logistics => "1688_logistics_info",
        }
    }

    /// Shaping applied to fetched records
    pub fn shaping(self) -> ShapingOptions {
        match self {
            Endpoint::Orders => ShapingOptions::orders(),
            Endpoint::Refunds => ShapingOptions::refunds(),
            Endpoint::Products | Endpoint::Logistics => ShapingOptions::default(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Endpoint::Orders => "orders",
            Endpoint::Refunds => "refunds",
            Endpoint::Products => "products",
            Endpoint::Logistics => "logistics",
        };
        f.write_str(name)
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orders" => Ok(Endpoint::Orders),
            "refunds" => Ok(Endpoint::Refunds),
            "products" => Ok(Endpoint::Products),
            "logistics" => Ok(Endpoint::Logistics),
            other => Err(format!(
                "Unknown endpoint '{other}' (expected orders, refunds, products or logistics)"
            )),
        }
    }
}

/// Gateway timestamp (`yyyyMMddHHmmssSSS+zzzz`, UTC) for the start or end of `day`
pub fn gateway_timestamp(day: NaiveDate, end_of_day: bool) -> String {
    let (time, millis) = if end_of_day {
        ("235959", "999")
    } else {
        ("000000", "000")
    };
    format!("{}{time}{millis}+0000", day.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_round_trip_names() {
        for endpoint in [
            Endpoint::Orders,
            Endpoint::Refunds,
            Endpoint::Products,
            Endpoint::Logistics,
        ] {
            assert_eq!(endpoint.to_string().parse::<Endpoint>(), Ok(endpoint));
        }
        assert!("invoices".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_gateway_timestamp() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(gateway_timestamp(day, false), "20250115000000000+0000");
        assert_eq!(gateway_timestamp(day, true), "20250115235959999+0000");
    }

    #[test]
    fn test_order_shaping_uses_create_time() {
        assert_eq!(
            Endpoint::Orders.shaping().date_column.as_deref(),
            Some("baseInfo.createTime")
        );
        assert_eq!(Endpoint::Refunds.range_params(), Some(("applyStartTime", "applyEndTime")));
    }
}
