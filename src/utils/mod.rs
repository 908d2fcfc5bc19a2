pub mod nap_totals;
