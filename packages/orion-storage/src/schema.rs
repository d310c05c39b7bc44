//! Bootstrap DDL assembled from `sql/init.sql` and the table files it includes.

pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_projects.sql")),
				"tables/003_forces.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_forces.sql")),
				"tables/004_clusters.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_clusters.sql")),
				"tables/005_usage_counters.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_usage_counters.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_table_include() {
		let schema = render_schema();

		assert!(!schema.contains("\\ir "), "{schema}");

		for table in ["users", "projects", "forces", "clusters", "usage_counters"] {
			assert!(
				schema.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
				"missing table {table}"
			);
		}
	}

	#[test]
	fn usage_counters_are_keyed_by_user_and_period() {
		assert!(render_schema().contains("PRIMARY KEY (user_id, period)"));
	}
}
