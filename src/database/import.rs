use super::{error::TypeError, schema::NewIngredient};

/*
Ingredient reference table

name,measurement_unit
абрикосовое варенье,г
"соль, морская",г
*/

/// Parses the two-column ingredient table. The first line is a header and is
/// skipped, blank lines are ignored. The name may be wrapped in double quotes
/// when it contains a comma, with `""` standing for a literal quote.
pub fn parse_ingredient_table(data: &str) -> Result<Vec<NewIngredient>, TypeError> {
    data.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            parse_ingredient_line(line.trim_end_matches('\r'))
                .map_err(|e| TypeError::new(&format!("Line {}: {}", i + 1, e.info())))
        })
        .collect()
}

fn parse_ingredient_line(line: &str) -> Result<NewIngredient, TypeError> {
    let (name, rest) = match line.strip_prefix('"') {
        Some(quoted) => {
            let mut name = String::new();
            let mut chars = quoted.char_indices().peekable();
            let mut end = None;

            while let Some((i, c)) = chars.next() {
                if c != '"' {
                    name.push(c);
                    continue;
                }
                match chars.peek() {
                    Some((_, '"')) => {
                        name.push('"');
                        chars.next();
                    }
                    _ => {
                        end = Some(i + 1);
                        break;
                    }
                }
            }

            let end = end.ok_or_else(|| TypeError::new("Unterminated quote"))?;
            let rest = quoted[end..]
                .strip_prefix(',')
                .ok_or_else(|| TypeError::new("Expected a comma after the quoted name"))?;
            (name, rest)
        }
        None => {
            let (name, rest) = line
                .split_once(',')
                .ok_or_else(|| TypeError::new("Expected two columns"))?;
            (name.to_string(), rest)
        }
    };

    let name = name.trim().to_string();
    let measurement_unit = rest.trim().trim_matches('"').to_string();

    if name.is_empty() {
        return Err(TypeError::new("Ingredient name is empty"));
    }
    if measurement_unit.is_empty() || measurement_unit.contains(',') {
        return Err(TypeError::new("Invalid measurement unit"));
    }

    Ok(NewIngredient {
        name,
        measurement_unit,
    })
}
