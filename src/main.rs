// Entry point and interactive CLI flow.
//
// - Option [1] (re)loads the storefront exports, printing diagnostics.
// - Option [2] generates the dashboard reports and a JSON summary.
// - Option [3] switches the sales-series period.
use std::io::{self, Write};

use chrono::Datelike;
use tracing::error;

use storefront_report::config::Config;
use storefront_report::output;
use storefront_report::reports::{self, count_rows, sum_totals};
use storefront_report::state::AppState;
use storefront_report::types::{
    CategorySalesRow, GrowthRow, OrderLine, OrderRecord, PeriodRow, Signup, TimedTotal,
    TopProductRow,
};
use storefront_report::util;
use storefront_report::Result;
use storefront_report::window::{filter_window, MonthWindow};

/// Read one menu choice; `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: drop cached exports and fetch them again.
fn handle_load(state: &mut AppState) {
    state.invalidate_all();

    let (lines, items) = match state.order_lines() {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to load order items: {e}");
            eprintln!(
                "Failed to load {}: {}\n",
                state.config.order_items_path.display(),
                e
            );
            return;
        }
    };
    let (orders, order_report) = match state.orders() {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to load orders: {e}");
            eprintln!(
                "Failed to load {}: {}\n",
                state.config.orders_path.display(),
                e
            );
            return;
        }
    };
    let (signups, signup_report) = match state.signups() {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to load profiles: {e}");
            eprintln!(
                "Failed to load {}: {}\n",
                state.config.profiles_path.display(),
                e
            );
            return;
        }
    };

    println!(
        "Processing exports... ({} order items, {} kept as sales lines)",
        util::format_int(items.total_items),
        util::format_int(lines.len())
    );
    println!(
        "Orders: {} loaded, {} skipped. Profiles: {} loaded, {} skipped.",
        util::format_int(orders.len()),
        util::format_int(order_report.parse_errors),
        util::format_int(signups.len()),
        util::format_int(signup_report.parse_errors)
    );
    if items.unreadable > 0 {
        println!(
            "Note: {} order items skipped because their fields had unexpected types.",
            util::format_int(items.unreadable)
        );
    }
    if items.skipped_invalid > 0 {
        println!(
            "Note: {} order items skipped due to invalid quantity or price.",
            util::format_int(items.skipped_invalid)
        );
    }
    if items.missing_category > 0 {
        println!(
            "Info: {} sales lines have no category and are left out of the category breakdown.",
            util::format_int(items.missing_category)
        );
    }
    println!();
}

/// Served from the fetch cache once option [1] has run.
fn fetch_all(state: &mut AppState) -> Result<(Vec<OrderLine>, Vec<OrderRecord>, Vec<Signup>)> {
    let (lines, _) = state.order_lines()?;
    let (orders, _) = state.orders()?;
    let (signups, _) = state.signups()?;
    Ok((lines, orders, signups))
}

fn sales_rows(orders: &[OrderRecord], completed_only: bool) -> Vec<TimedTotal> {
    orders
        .iter()
        .filter(|o| !completed_only || o.is_completed())
        .map(OrderRecord::to_timed)
        .collect()
}

/// Handle option [2]: build every report, export it and print a preview.
fn handle_generate_reports(state: &mut AppState) {
    if !state.has_data() {
        println!("Error: No data loaded. Please load the exports first (option 1).\n");
        return;
    }
    let (lines, orders, signups) = match fetch_all(state) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to read data: {}\n", e);
            return;
        }
    };

    let cfg = &state.config;
    let today = cfg.today;
    let out = |name: &str| cfg.output_dir.join(name);

    println!("Generating reports for {}...", today.format("%Y-%m-%d"));
    println!("Outputs saved to {}\n", cfg.output_dir.display());

    let categories = reports::aggregate_category_sales(&lines);
    let r1: Vec<CategorySalesRow> = categories.iter().map(CategorySalesRow::from).collect();
    let file1 = out("report1_category_sales.csv");
    if let Err(e) = output::write_csv(&file1, &r1) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table("Report 1: Sales by Category", Some("Highest total first"), &r1, 5);
    println!("(Full table exported to {})\n", file1.display());

    let products = reports::rank_top_products(&lines, cfg.top_products);
    let r2 = TopProductRow::ranked(&products);
    let file2 = out("report2_top_products.csv");
    if let Err(e) = output::write_csv(&file2, &r2) {
        eprintln!("Write error: {}", e);
    }
    let note2 = format!("Top {} by units sold", cfg.top_products);
    output::preview_table("Report 2: Top Products", Some(&note2), &r2, cfg.top_products);
    println!("(Full table exported to {})\n", file2.display());

    let sales = sales_rows(&orders, cfg.completed_only);
    let buckets = reports::bucket_sales(&sales, state.period, today.year());
    let r3: Vec<PeriodRow> = buckets.iter().map(PeriodRow::from).collect();
    let file3 = out(format!("report3_sales_{}.csv", state.period).as_str());
    if let Err(e) = output::write_csv(&file3, &r3) {
        eprintln!("Write error: {}", e);
    }
    let note3 = format!("{} buckets, anchored on {}", state.period, today.year());
    output::preview_table("Report 3: Sales Over Time", Some(&note3), &r3, r3.len());
    println!("(Full table exported to {})\n", file3.display());

    let current = MonthWindow::current(today);
    let previous = MonthWindow::previous(today);
    let revenue_growth = reports::compare_to_previous_month(
        &filter_window(&sales, &current),
        &filter_window(&sales, &previous),
        sum_totals,
    );
    let user_growth = reports::compare_to_previous_month(
        &filter_window(&signups, &current),
        &filter_window(&signups, &previous),
        count_rows,
    );
    let r4 = vec![
        GrowthRow::new("Revenue", &revenue_growth, 2),
        GrowthRow::new("New users", &user_growth, 0),
    ];
    let file4 = out("report4_growth.csv");
    if let Err(e) = output::write_csv(&file4, &r4) {
        eprintln!("Write error: {}", e);
    }
    output::preview_table(
        "Report 4: Month over Month",
        Some("Current vs previous calendar month"),
        &r4,
        2,
    );
    println!("(Full table exported to {})\n", file4.display());

    let summary = reports::summarize(today, &lines, &sales, revenue_growth, user_growth);
    if let Err(e) = output::write_json(out("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_revenue\": {}, \"revenue_growth\": \"{}\", \"user_growth\": \"{}\"}}\n",
        util::format_number(summary.total_revenue, 2),
        util::format_change(summary.revenue_growth.percentage_change),
        util::format_change(summary.user_growth.percentage_change)
    );
}

/// Handle option [3]: cycle monthly -> quarterly -> yearly.
fn handle_switch_period(state: &mut AppState) {
    state.period = state.period.next();
    println!("Sales series period is now {}.\n", state.period);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_report=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    tracing::info!(today = %config.today, period = %config.period, "Starting storefront report");
    let mut state = AppState::new(config);

    loop {
        println!("Storefront Sales Reports:");
        println!("[1] Load the exports");
        println!("[2] Generate Reports");
        println!("[3] Switch period (currently {})\n", state.period);
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut state),
            "2" => {
                println!();
                handle_generate_reports(&mut state);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_switch_period(&mut state),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}
