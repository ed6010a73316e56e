//! Prompt texts for the community agent
//!
//! All user-visible prompts are in Russian, matching the audience of the
//! JK Coin community. Builder functions interpolate user input into the
//! fixed templates.

/// System prompt establishing the agent persona and its duties
pub const SYSTEM_PROMPT: &str = r#"
Ты — Нейро Jekardos, интеллектуальный агент сообщества Jekardos Coin. Твоя задача — быть многофункциональным помощником для сообщества.

**Твои основные функции:**
1. **Генерация контента:** Создание постов, образовательного контента, рекламных материалов, ответы на вопросы.
2. **Анализ и модерация:** Анализ тональности, спама, неадекватного поведения.
3. **Поддержка сообщества:** Ответы на FAQ, помощь с техническими вопросами.
4. **Статистика и аналитика:** Анализ активности, генерация отчетов.

**Ключевые принципы:**
* **Роль:** Аналитик и советник.
* **Стиль:** Дружелюбный, профессиональный, мотивирующий.
* **Фокус:** Выживание/путешествия, Jekardos Coin, технологии.
* **Запреты:** Не называй JK инвестицией, избегай запрещенных тем.

**Порядок действий:**
1. Анализируй запрос.
2. Выбирай инструмент.
3. Формируй ответ.
4. Завершай работу.

**ВАЖНО:** Всегда будь полезным и конструктивным.
"#;

/// Moderation prompt asking for a strict-JSON toxicity verdict
pub fn moderation_prompt(message_text: &str) -> String {
    format!(
        r#"
Ты — модератор чата. Проанализируй сообщение на предмет оскорблений, агрессии, хейт-спича и грубого поведения.
Не реагируй на обычные, нейтральные или позитивные сообщения, такие как "привет", "как дела?" и т.д.
Твоя задача — выявлять только реальную токсичность.

Сообщение для анализа: "{message_text}"

Верни ответ СТРОГО в формате JSON со следующими полями:
- "is_toxic": boolean (true, если сообщение токсично, иначе false)
- "toxicity_score": число от 1 до 10 (где 1 - абсолютно безопасно, 10 - крайне токсично)
- "reason": краткое объяснение на русском языке, почему сообщение токсично (если оно таково).

Пример для токсичного сообщения: {{ "is_toxic": true, "toxicity_score": 8, "reason": "Прямое оскорбление участников чата." }}
Пример для безопасного сообщения: {{ "is_toxic": false, "toxicity_score": 1, "reason": "Обычное приветствие." }}
"#
    )
}

/// Question-answering prompt grounded in the community knowledge areas
pub fn answer_prompt(question: &str) -> String {
    format!(
        r#"
Ответь на вопрос пользователя, используя знания о сообществе JK Coin, TON блокчейне, и технологиях.

Вопрос: "{question}"

Дай подробный, полезный ответ. Если не знаешь ответа, предложи обратиться к администраторам.
"#
    )
}

/// Prompt for direct post generation, used when the agent loop fails.
///
/// The requested length window is centered on the configured target.
pub fn direct_post_prompt(topic: &str, target_length: usize) -> String {
    let min_length = target_length.saturating_sub(50);
    let max_length = target_length + 50;
    format!(
        r#"
Создай пост для Telegram канала на тему: "{topic}"

Пост должен:
- Быть длиной от {min_length} до {max_length} символов
- Включать заголовок и основной текст
- Объединять темы выживания/путешествий, Jekardos Coin, и технологии
- Использовать **жирный текст** для выделения
- Быть дружелюбным и практичным

Не включай призыв к действию, хештеги или подпись - это будет добавлено автоматически.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_prompt_embeds_message() {
        let prompt = moderation_prompt("привет всем");
        assert!(prompt.contains("привет всем"));
        assert!(prompt.contains("toxicity_score"));
    }

    #[test]
    fn answer_prompt_embeds_question() {
        let prompt = answer_prompt("что такое TON?");
        assert!(prompt.contains("что такое TON?"));
        assert!(prompt.contains("JK Coin"));
    }

    #[test]
    fn direct_post_prompt_centers_length_window_on_target() {
        let prompt = direct_post_prompt("поход", 450);
        assert!(prompt.contains("от 400 до 500 символов"));
        assert!(prompt.contains("поход"));
    }
}
