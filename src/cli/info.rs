use std::path::Path;

use serde::Serialize;

use crate::store::{RoleFilter, Store};
use crate::types::{Iteration, SettingKey};

use super::init_store;

#[derive(Serialize)]
struct IterationOutput {
    id: i64,
    name: String,
    question_set: String,
    start_date: String,
    end_date: Option<String>,
    units: usize,
    roles: usize,
    surveys: usize,
}

#[derive(Serialize)]
struct ServerInfo {
    people: usize,
    target: String,
    active_iteration: Option<i64>,
    iterations: Vec<IterationOutput>,
}

fn describe_iteration(store: &dyn Store, iteration: &Iteration) -> anyhow::Result<IterationOutput> {
    let units = store.list_units(iteration.id)?.len();
    let roles = store
        .list_roles(RoleFilter {
            iteration_id: Some(iteration.id),
            ..Default::default()
        })?
        .len();
    let surveys = store.list_surveys(iteration.id)?.len();

    Ok(IterationOutput {
        id: iteration.id,
        name: iteration.name.clone(),
        question_set: iteration.question_set.clone(),
        start_date: iteration.start_date.to_rfc3339(),
        end_date: iteration.end_date.map(|dt| dt.to_rfc3339()),
        units,
        roles,
        surveys,
    })
}

pub fn run_info(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let store = init_store(data_dir)?;

    let people = store.list_people()?.len();
    let target = store.get_setting(SettingKey::Target)?.value;
    let active_iteration = store.get_active_iteration()?.map(|it| it.id);

    let mut iterations = Vec::new();
    for iteration in store.list_iterations()? {
        iterations.push(describe_iteration(&store, &iteration)?);
    }

    let info = ServerInfo {
        people,
        target,
        active_iteration,
        iterations,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!();
    println!("Orgpulse Status");
    println!("{}", "─".repeat(15));
    println!("People:      {}", info.people);
    println!(
        "Target:      {}",
        if info.target.is_empty() { "<unset>" } else { info.target.as_str() }
    );
    println!("Iterations:  {}", info.iterations.len());
    for it in &info.iterations {
        let marker = if Some(it.id) == info.active_iteration {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} #{} {} ({} units, {} roles, {} surveys)",
            it.id, it.name, it.units, it.roles, it.surveys
        );
    }
    println!();

    Ok(())
}
